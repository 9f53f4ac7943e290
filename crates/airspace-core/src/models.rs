//! Core data models for restricted zones, positions and conflicts.

use crate::error::{GeometryError, ZoneError};
use crate::plan_state::PlanState;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a drawing is turned into a corridor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    Point,
    #[default]
    Line,
    Polygon,
}

/// Restriction class of a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Restriction {
    #[default]
    #[serde(rename = "NO_RESTRICTION")]
    NoRestriction,
    #[serde(rename = "CONDITIONAL")]
    Conditional,
    #[serde(rename = "REQ_AUTHORISATION")]
    RequiresAuthorisation,
    #[serde(rename = "PROHIBITED")]
    Prohibited,
    /// Any class this build does not know about
    #[serde(other)]
    Unknown,
}

impl Restriction {
    /// Numeric severity (0-3). Unknown classes rank with `NoRestriction`.
    pub fn severity(self) -> i32 {
        match self {
            Restriction::NoRestriction | Restriction::Unknown => 0,
            Restriction::Conditional => 1,
            Restriction::RequiresAuthorisation => 2,
            Restriction::Prohibited => 3,
        }
    }
}

/// Data feed a zone or map feature came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneSource {
    /// User-drawn zones
    #[serde(rename = "coordinate")]
    Coordinate,
    #[serde(rename = "operationplans")]
    OperationPlans,
    #[serde(rename = "weather-observations")]
    WeatherObservations,
    #[serde(other)]
    Other,
}

impl ZoneSource {
    /// Ranking priority; unrecognized feeds get -1.
    pub fn priority(self) -> i32 {
        match self {
            ZoneSource::Coordinate => 3,
            ZoneSource::OperationPlans => 2,
            ZoneSource::WeatherObservations => 1,
            ZoneSource::Other => -1,
        }
    }
}

/// Raw vertical limit as sent by the zone feed: a number of meters or a
/// text value such as `"AGL"` or `"120"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AltitudeRef {
    Meters(f64),
    Text(String),
}

/// Symbolic ground reference. Treated as 0 m with no terrain correction.
pub const GROUND_REFERENCE: &str = "AGL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedMessage {
    pub language: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProperties {
    #[serde(default)]
    pub localized_messages: Vec<LocalizedMessage>,
}

/// Properties map of a zone feature. Every field is optional on the wire;
/// defaults are resolved by the accessors on [`RestrictedZone`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneProperties {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub restriction: Option<Restriction>,
    #[serde(default)]
    pub lower: Option<AltitudeRef>,
    #[serde(default)]
    pub upper: Option<AltitudeRef>,
    #[serde(default)]
    pub lower_meters: Option<f64>,
    #[serde(default)]
    pub upper_meters: Option<f64>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub source: Option<ZoneSource>,
    /// Lifecycle state, only meaningful for operation-plan features
    #[serde(default)]
    pub state: Option<PlanState>,
    /// Forces maximum severity when ranking
    #[serde(default, rename = "_rejecting")]
    pub rejecting: Option<bool>,
    #[serde(default)]
    pub extended_properties: Option<ExtendedProperties>,
}

/// A restricted-airspace snapshot: horizontal boundary plus vertical band.
///
/// Geometry is kept as loaded; malformed rings are only rejected by the
/// predicates that cannot evaluate them.
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictedZone {
    pub geometry: MultiPolygon<f64>,
    pub properties: ZoneProperties,
}

impl RestrictedZone {
    pub fn new(geometry: MultiPolygon<f64>, properties: ZoneProperties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.properties.identifier.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.name.as_deref()
    }

    /// Restriction class, `NoRestriction` when absent.
    pub fn restriction(&self) -> Restriction {
        self.properties.restriction.unwrap_or_default()
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.hidden.unwrap_or(false)
    }

    pub fn is_rejecting(&self) -> bool {
        self.properties.rejecting.unwrap_or(false)
    }

    /// Reason text; the feed's placeholder `"Other"` counts as no reason.
    pub fn reason(&self) -> Option<&str> {
        match self.properties.reason.as_deref() {
            Some("Other") | Some("") | None => None,
            Some(reason) => Some(reason),
        }
    }

    /// Message in the requested language, falling back to the plain message.
    ///
    /// A localized entry matches when its language tag starts with `"{lang}-"`.
    pub fn localised_message(&self, lang: Option<&str>) -> Option<&str> {
        let fallback = self.properties.message.as_deref();
        let Some(lang) = lang.filter(|l| !l.is_empty()) else {
            return fallback;
        };
        let prefix = format!("{lang}-");
        self.properties
            .extended_properties
            .as_ref()
            .and_then(|ext| {
                ext.localized_messages
                    .iter()
                    .find(|m| m.language.starts_with(&prefix))
            })
            .map(|m| m.message.as_str())
            .filter(|m| !m.is_empty())
            .or(fallback)
    }

    /// Floor of the vertical band in meters.
    ///
    /// Absent or `"AGL"` means ground (0 m). Text that does not parse as a
    /// number also resolves to ground.
    pub fn lower_limit_m(&self) -> f64 {
        match &self.properties.lower {
            None => 0.0,
            Some(AltitudeRef::Meters(m)) => *m,
            Some(AltitudeRef::Text(text)) => {
                let text = text.trim();
                if text.is_empty() || text.eq_ignore_ascii_case(GROUND_REFERENCE) {
                    0.0
                } else {
                    parse_leading_float(text).unwrap_or(0.0)
                }
            }
        }
    }

    /// Ceiling of the vertical band in meters, `None` when unbounded.
    pub fn upper_limit_m(&self) -> Option<f64> {
        match &self.properties.upper {
            None => None,
            Some(AltitudeRef::Meters(m)) => Some(*m),
            Some(AltitudeRef::Text(text)) => parse_leading_float(text.trim()),
        }
    }
}

// Longest numeric prefix, the way a lenient float parse reads "120 m".
fn parse_leading_float(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
        .unwrap_or(trimmed.len());
    (1..=end)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
}

impl TryFrom<geojson::Feature> for RestrictedZone {
    type Error = ZoneError;

    fn try_from(feature: geojson::Feature) -> Result<Self, Self::Error> {
        let geometry = feature.geometry.ok_or(ZoneError::MissingGeometry)?;
        let geometry = area_from_geojson(&geometry.value)?;
        let properties = match feature.properties {
            Some(map) => serde_json::from_value(serde_json::Value::Object(map))?,
            None => ZoneProperties::default(),
        };
        Ok(Self::new(geometry, properties))
    }
}

/// Convert every convertible feature of a collection into a zone.
///
/// Features without an area geometry or with unreadable properties are
/// logged and left out, so a partial snapshot still loads.
pub fn zones_from_collection(collection: geojson::FeatureCollection) -> Vec<RestrictedZone> {
    collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(index, feature)| match RestrictedZone::try_from(feature) {
            Ok(zone) => Some(zone),
            Err(err) => {
                tracing::warn!(feature = index, error = %err, "skipping zone feature");
                None
            }
        })
        .collect()
}

/// Parse a GeoJSON `FeatureCollection` document into zones.
pub fn load_zones(text: &str) -> Result<Vec<RestrictedZone>, ZoneError> {
    match geojson::GeoJson::from_str(text)? {
        geojson::GeoJson::FeatureCollection(collection) => Ok(zones_from_collection(collection)),
        geojson::GeoJson::Feature(_) => Err(ZoneError::NotACollection("Feature")),
        geojson::GeoJson::Geometry(_) => Err(ZoneError::NotACollection("Geometry")),
    }
}

/// Convert a GeoJSON Polygon or MultiPolygon into a `geo` multipolygon.
pub fn area_from_geojson(value: &geojson::Value) -> Result<MultiPolygon<f64>, GeometryError> {
    match value {
        geojson::Value::Polygon(rings) => Ok(MultiPolygon(vec![polygon_from_rings(rings)?])),
        geojson::Value::MultiPolygon(polygons) => Ok(MultiPolygon(
            polygons
                .iter()
                .map(|rings| polygon_from_rings(rings))
                .collect::<Result<_, _>>()?,
        )),
        other => Err(GeometryError::UnsupportedGeometry(
            geojson_type_name(other).to_string(),
        )),
    }
}

fn polygon_from_rings(rings: &[Vec<geojson::Position>]) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(ring: &[geojson::Position]) -> Result<LineString<f64>, GeometryError> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            short => Err(GeometryError::ShortPosition(short.len())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn geojson_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Wrap an area as a property-less GeoJSON feature.
pub fn area_to_feature(area: &MultiPolygon<f64>) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(area))),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

/// A 3D point used for containment queries, e.g. live telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub altitude_m: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lng,
            altitude_m,
        }
    }

    /// Horizontal coordinate in lon/lat axis order.
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

/// A zone the position sits inside, within the zone's vertical band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub zone_id: Option<String>,
    pub zone_name: Option<String>,
    pub restriction: Restriction,
    /// Derived from `restriction`, 0-3
    pub severity: i32,
    pub lower_m: f64,
    /// `None` when the band has no ceiling
    pub upper_m: Option<f64>,
    pub source: Option<ZoneSource>,
    pub state: Option<PlanState>,
    /// Zone carries the rejecting override
    #[serde(default)]
    pub rejecting: bool,
    /// Ranking altitudes copied from the zone's `lowerMeters`/`upperMeters`
    #[serde(default)]
    pub lower_meters: Option<f64>,
    #[serde(default)]
    pub upper_meters: Option<f64>,
}
