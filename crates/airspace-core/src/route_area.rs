//! Corridor generation from user drawings.
//!
//! A drawing is an ordered list of lon/lat points plus a [`DrawingMode`].
//! Public distances are meters; the buffering helpers below work in
//! kilometers and the conversion happens once, in
//! [`create_route_area_with`].

use crate::error::{DrawingError, GeometryError};
use crate::geometry::{build_polygon, union_fold, validate_polygon_safety};
use crate::models::{area_to_feature, DrawingMode};
use crate::rules::AirspaceRules;
use crate::spatial::{
    bearing, destination, haversine_distance, midpoint, normalize_coordinate, EARTH_RADIUS_KM,
};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

const METERS_PER_KM: f64 = 1000.0;

/// Segments shorter than this are buffered as a circle.
const DEGENERATE_SEGMENT_M: f64 = 1e-6;

/// Buffered geometry produced from a drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum Corridor {
    /// One buffered region
    Feature(MultiPolygon<f64>),
    /// Independently buffered pieces, left unmerged
    Collection(Vec<MultiPolygon<f64>>),
}

impl Corridor {
    pub fn empty() -> Self {
        Corridor::Collection(Vec::new())
    }

    pub fn features(&self) -> &[MultiPolygon<f64>] {
        match self {
            Corridor::Feature(area) => std::slice::from_ref(area),
            Corridor::Collection(areas) => areas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features().is_empty()
    }

    /// All pieces folded into one region, skipping pieces that fail to union.
    pub fn unified(&self) -> Option<MultiPolygon<f64>> {
        union_fold(self.features())
    }

    pub fn to_geojson(&self) -> geojson::GeoJson {
        match self {
            Corridor::Feature(area) => geojson::GeoJson::Feature(area_to_feature(area)),
            Corridor::Collection(areas) => {
                geojson::GeoJson::FeatureCollection(geojson::FeatureCollection {
                    bbox: None,
                    features: areas.iter().map(area_to_feature).collect(),
                    foreign_members: None,
                })
            }
        }
    }
}

/// Build a corridor with the default arc resolution.
pub fn create_route_area(
    points: &[Coord<f64>],
    mode: DrawingMode,
    buffer_m: f64,
) -> Result<Corridor, GeometryError> {
    create_route_area_with(points, mode, buffer_m, &AirspaceRules::default())
}

/// Build a corridor from a drawing.
///
/// Line drawings are split into consecutive segments that are buffered one
/// by one and returned unmerged; buffering the whole polyline can fold over
/// itself at sharp turns.
pub fn create_route_area_with(
    points: &[Coord<f64>],
    mode: DrawingMode,
    buffer_m: f64,
    rules: &AirspaceRules,
) -> Result<Corridor, GeometryError> {
    if points.is_empty() {
        return Ok(Corridor::empty());
    }
    if !buffer_m.is_finite() || buffer_m < 0.0 {
        return Err(GeometryError::InvalidBuffer(buffer_m));
    }
    if let Some(bad) = points.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate { x: bad.x, y: bad.y });
    }

    let coords = closed_drawing(points, mode);
    let radius_km = buffer_m / METERS_PER_KM;
    let steps = rules.buffer_steps.max(1);

    tracing::debug!(?mode, points = coords.len(), buffer_m, "building route area");

    if coords.len() == 1 {
        return Ok(buffer_point(coords[0], radius_km, steps)
            .map_or_else(Corridor::empty, Corridor::Feature));
    }

    match mode {
        DrawingMode::Line => Ok(Corridor::Collection(
            coords
                .windows(2)
                .filter_map(|pair| buffer_segment(pair[0], pair[1], radius_km, steps))
                .collect(),
        )),
        DrawingMode::Polygon if points.len() >= 3 => {
            let polygon = build_polygon(&[coords])?;
            Ok(Corridor::Feature(buffer_polygon(&polygon, radius_km, steps)))
        }
        _ => Ok(buffer_line(&coords, radius_km, steps)
            .map_or_else(Corridor::empty, Corridor::Feature)),
    }
}

/// Polygon drawings with more than two points get their first point
/// repeated at the end.
fn closed_drawing(points: &[Coord<f64>], mode: DrawingMode) -> Vec<Coord<f64>> {
    let mut coords = points.to_vec();
    if mode == DrawingMode::Polygon && coords.len() > 2 {
        coords.push(coords[0]);
    }
    coords
}

/// Circle around a point. `None` for a zero radius.
pub fn buffer_point(center: Coord<f64>, radius_km: f64, steps: usize) -> Option<MultiPolygon<f64>> {
    if radius_km <= 0.0 {
        return None;
    }
    let angular = radius_km / EARTH_RADIUS_KM;
    let segments = 4 * steps;
    let ring: Vec<Coord<f64>> = (0..segments)
        .map(|k| {
            let heading = 2.0 * PI * k as f64 / segments as f64;
            let (lat, lon) = destination(center.y, center.x, angular, heading);
            Coord { x: lon, y: lat }
        })
        .collect();
    Some(MultiPolygon(vec![Polygon::new(LineString::new(ring), vec![])]))
}

/// Capsule around one segment: half circles at both ends joined by the
/// offset edges. `None` for a zero radius.
pub fn buffer_segment(
    start: Coord<f64>,
    end: Coord<f64>,
    radius_km: f64,
    steps: usize,
) -> Option<MultiPolygon<f64>> {
    if radius_km <= 0.0 {
        return None;
    }
    if haversine_distance(start.y, start.x, end.y, end.x) < DEGENERATE_SEGMENT_M {
        return buffer_point(start, radius_km, steps);
    }

    let angular = radius_km / EARTH_RADIUS_KM;
    let heading_at_start = bearing(start.y, start.x, end.y, end.x);
    let heading_at_end = bearing(end.y, end.x, start.y, start.x) + PI;

    let mut ring = half_circle(end, angular, heading_at_end - FRAC_PI_2, steps);
    ring.extend(half_circle(start, angular, heading_at_start + FRAC_PI_2, steps));
    Some(MultiPolygon(vec![Polygon::new(LineString::new(ring), vec![])]))
}

// Clockwise half circle starting at `from` heading.
fn half_circle(center: Coord<f64>, angular: f64, from: f64, steps: usize) -> Vec<Coord<f64>> {
    let segments = 2 * steps;
    (0..=segments)
        .map(|k| {
            let heading = from + PI * k as f64 / segments as f64;
            let (lat, lon) = destination(center.y, center.x, angular, heading);
            Coord { x: lon, y: lat }
        })
        .collect()
}

/// Whole polyline as one region: the union of its segment capsules.
pub fn buffer_line(coords: &[Coord<f64>], radius_km: f64, steps: usize) -> Option<MultiPolygon<f64>> {
    let capsules: Vec<MultiPolygon<f64>> = coords
        .windows(2)
        .filter_map(|pair| buffer_segment(pair[0], pair[1], radius_km, steps))
        .collect();
    union_fold(&capsules)
}

/// Polygon grown outward by the radius: the polygon joined with a capsule
/// around every edge. A zero radius returns the polygon itself.
pub fn buffer_polygon(polygon: &Polygon<f64>, radius_km: f64, steps: usize) -> MultiPolygon<f64> {
    let original = MultiPolygon(vec![polygon.clone()]);
    if radius_km <= 0.0 {
        return original;
    }

    let mut pieces = vec![original.clone()];
    pieces.extend(
        std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.lines())
            .filter_map(|edge| buffer_segment(edge.start, edge.end, radius_km, steps)),
    );
    union_fold(&pieces).unwrap_or(original)
}

/// Geodesic midpoint of every adjacent pair, used for edit handles.
pub fn calculate_midpoints(points: &[Coord<f64>]) -> Vec<Coord<f64>> {
    points
        .windows(2)
        .map(|pair| midpoint(pair[0], pair[1]))
        .collect()
}

/// Check that a drawing is complete enough to submit.
pub fn validate_drawing(
    points: &[Coord<f64>],
    mode: DrawingMode,
    rules: &AirspaceRules,
) -> Result<(), DrawingError> {
    if points.is_empty() {
        return Err(DrawingError::EmptyPath);
    }
    match mode {
        DrawingMode::Line if points.len() < rules.min_line_vertices => {
            Err(DrawingError::PathTooShort)
        }
        DrawingMode::Polygon if points.len() < rules.min_polygon_vertices => {
            Err(DrawingError::AreaIncomplete)
        }
        DrawingMode::Polygon => match validate_polygon_safety(&[closed_drawing(points, mode)]) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(DrawingError::IntersectingPolygon),
        },
        _ => Ok(()),
    }
}

/// Drawing document as kept by the map editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingState {
    /// `[lng, lat]` pairs in drawing order
    pub current_drawing: Vec<[f64; 2]>,
    #[serde(default)]
    pub drawing_mode: DrawingMode,
    /// Buffer in meters
    #[serde(default)]
    pub buffer: Option<f64>,
}

impl DrawingState {
    /// Drawn points with longitudes wrapped.
    pub fn points(&self) -> Vec<Coord<f64>> {
        self.current_drawing
            .iter()
            .map(|[lng, lat]| normalize_coordinate(Coord { x: *lng, y: *lat }))
            .collect()
    }

    pub fn buffer_m(&self, rules: &AirspaceRules) -> f64 {
        self.buffer.unwrap_or(rules.default_buffer_m)
    }
}

/// Corridor plus the editing handles for the same drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteArea {
    pub route_area: Corridor,
    pub midpoints: Vec<Coord<f64>>,
    pub coordinates: Vec<Coord<f64>>,
    pub mode: DrawingMode,
    pub buffer_m: f64,
}

pub fn create_route_area_with_midpoints(
    state: &DrawingState,
    rules: &AirspaceRules,
) -> Result<RouteArea, GeometryError> {
    let coordinates = state.points();
    let buffer_m = state.buffer_m(rules);
    let route_area = create_route_area_with(&coordinates, state.drawing_mode, buffer_m, rules)?;
    Ok(RouteArea {
        route_area,
        midpoints: calculate_midpoints(&coordinates),
        coordinates,
        mode: state.drawing_mode,
        buffer_m,
    })
}
