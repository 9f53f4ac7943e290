//! airspace - check drawn drone routes and positions against restricted zones

mod config;

use airspace_core::models::area_to_feature;
use airspace_core::plan_state::{get_computed_status, OperationPlan};
use airspace_core::route_area::create_route_area_with_midpoints;
use airspace_core::{
    load_zones, parse_telemetry_array, prune_stale, validate_drawing, ConflictDetector,
    normalize_coordinate, DrawingState, Position, RestrictedZone,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Route corridor and restricted-zone checks on local GeoJSON/JSON files
#[derive(Parser, Debug)]
#[command(name = "airspace", author, version, about)]
struct Args {
    /// JSON file overriding the default airspace rules
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the buffered corridor for a drawing
    Route {
        /// Drawing document (`currentDrawing`, `drawingMode`, `buffer`)
        #[arg(long)]
        drawing: PathBuf,
    },
    /// List the zones a drawing's corridor intersects, ranked
    Check {
        /// Zone FeatureCollection
        #[arg(long)]
        zones: PathBuf,
        #[arg(long)]
        drawing: PathBuf,
    },
    /// List the zones a 3D position violates, ranked
    Position {
        #[arg(long)]
        zones: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Altitude in meters
        #[arg(long, default_value_t = 0.0)]
        alt: f64,
    },
    /// Check every fresh aircraft in a telemetry dump against the zones
    Telemetry {
        #[arg(long)]
        zones: PathBuf,
        /// JSON array of positional telemetry arrays
        #[arg(long)]
        telemetry: PathBuf,
        /// Reference time for staleness (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Derive lifecycle flags for an operation plan
    PlanStatus {
        #[arg(long)]
        plan: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.rules.as_deref())?;
    init_tracing(config.log_json)?;

    let output = match args.command {
        Command::Route { drawing } => route(&config, &drawing)?,
        Command::Check { zones, drawing } => check(&config, &zones, &drawing)?,
        Command::Position {
            zones,
            lat,
            lng,
            alt,
        } => position(&zones, query_position(lat, lng, alt))?,
        Command::Telemetry {
            zones,
            telemetry,
            now,
        } => telemetry_check(&config, &zones, &telemetry, now.unwrap_or_else(Utc::now))?,
        Command::PlanStatus { plan } => plan_status(&plan)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("airspace=info".parse()?)
        .add_directive("airspace_core=info".parse()?);

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_zones(path: &Path) -> Result<ConflictDetector> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let zones = load_zones(&text).with_context(|| format!("loading zones from {}", path.display()))?;
    tracing::info!(zones = zones.len(), path = %path.display(), "zones loaded");
    Ok(ConflictDetector::new(zones))
}

fn route(config: &Config, drawing: &Path) -> Result<Value> {
    let state: DrawingState = read_json(drawing)?;
    let validation = validate_drawing(&state.points(), state.drawing_mode, &config.rules).err();
    if let Some(err) = validation {
        tracing::warn!(key = err.i18n_key(), "drawing is not ready: {err}");
    }

    let area = create_route_area_with_midpoints(&state, &config.rules)?;
    let pairs = |coords: &[geo::Coord<f64>]| -> Vec<[f64; 2]> {
        coords.iter().map(|c| [c.x, c.y]).collect()
    };
    Ok(json!({
        "routeArea": area.route_area.to_geojson(),
        "midpoints": pairs(&area.midpoints),
        "coordinates": pairs(&area.coordinates),
        "drawingMode": area.mode,
        "buffer": area.buffer_m,
        "error": validation.map(|e| e.i18n_key()),
    }))
}

fn check(config: &Config, zones: &Path, drawing: &Path) -> Result<Value> {
    let detector = read_zones(zones)?;
    let state: DrawingState = read_json(drawing)?;
    let hits = detector.check_route(&state, &config.rules)?;
    let features = hits
        .iter()
        .map(zone_feature)
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_value(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })?)
}

fn zone_feature(zone: &RestrictedZone) -> Result<geojson::Feature> {
    let mut feature = area_to_feature(&zone.geometry);
    if let Value::Object(properties) = serde_json::to_value(&zone.properties)? {
        feature.properties = Some(properties);
    }
    Ok(feature)
}

// Longitude is wrapped like drawn and telemetry coordinates.
fn query_position(lat: f64, lng: f64, alt: f64) -> Position {
    let coord = normalize_coordinate(geo::Coord { x: lng, y: lat });
    Position::new(coord.y, coord.x, alt)
}

fn position(zones: &Path, position: Position) -> Result<Value> {
    let detector = read_zones(zones)?;
    Ok(serde_json::to_value(detector.violations_at(&position))?)
}

fn telemetry_check(
    config: &Config,
    zones: &Path,
    telemetry: &Path,
    now: DateTime<Utc>,
) -> Result<Value> {
    let detector = read_zones(zones)?;
    let raw: Vec<Vec<Value>> = read_json(telemetry)?;

    let mut records: Vec<_> = raw
        .iter()
        .enumerate()
        .filter_map(|(index, data)| match parse_telemetry_array(data) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(record = index, error = %err, "skipping telemetry record");
                None
            }
        })
        .collect();
    prune_stale(&mut records, now, config.rules.telemetry_staleness());

    let report: Vec<Value> = records
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "name": record.name,
                "speedKmh": record.speed_kmh(),
                "bearing": record.bearing_deg(),
                "conflicts": detector.violations_at(&record.position()),
            })
        })
        .collect();
    Ok(Value::Array(report))
}

fn plan_status(plan: &Path) -> Result<Value> {
    let plan: OperationPlan = read_json(plan)?;
    Ok(serde_json::to_value(get_computed_status(&plan))?)
}
