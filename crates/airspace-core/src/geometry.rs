//! Planar primitives over zone and corridor polygons.
//!
//! Point containment uses even-odd ray casting in lon/lat space. Unions and
//! intersects tests go through `geo`, with engine failures turned into
//! [`GeometryError`] values so callers can decide whether to absorb them.

use crate::error::GeometryError;
use geo::line_intersection::line_intersection;
use geo::{BooleanOps, Coord, Intersects, Line, LineString, MultiPolygon, Polygon};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Minimum positions in a closed linear ring.
pub const MIN_RING_POSITIONS: usize = 4;

/// Even-odd ray casting test against one ring.
pub fn point_in_ring(point: Coord<f64>, ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    let n = coords.len();
    if n == 0 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (coords[i].x, coords[i].y);
        let (xj, yj) = (coords[j].x, coords[j].y);

        if ((yi > point.y) != (yj > point.y))
            && (point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Inside the exterior ring and outside every hole.
pub fn point_in_polygon(point: Coord<f64>, polygon: &Polygon<f64>) -> bool {
    point_in_ring(point, polygon.exterior())
        && !polygon
            .interiors()
            .iter()
            .any(|hole| point_in_ring(point, hole))
}

/// True when any member polygon contains the point.
pub fn point_in_polygon_feature(point: Coord<f64>, feature: &MultiPolygon<f64>) -> bool {
    feature.0.iter().any(|polygon| point_in_polygon(point, polygon))
}

/// Build a polygon from raw rings, rejecting malformed input instead of
/// producing a degenerate shape.
///
/// Ring 0 is the exterior, the rest are holes.
pub fn build_polygon(rings: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>, GeometryError> {
    let (exterior, holes) = rings.split_first().ok_or(GeometryError::NoRings)?;
    for (index, ring) in rings.iter().enumerate() {
        validate_ring(index, ring)?;
    }
    Ok(Polygon::new(
        LineString::from(exterior.clone()),
        holes.iter().cloned().map(LineString::from).collect(),
    ))
}

/// Check every ring of every member polygon.
pub fn validate_multipolygon(geometry: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    for polygon in &geometry.0 {
        for (index, ring) in rings(polygon).enumerate() {
            validate_ring(index, &ring.0)?;
        }
    }
    Ok(())
}

fn validate_ring(index: usize, coords: &[Coord<f64>]) -> Result<(), GeometryError> {
    if coords.len() < MIN_RING_POSITIONS {
        return Err(GeometryError::TooFewPositions {
            ring: index,
            found: coords.len(),
        });
    }
    if let Some(bad) = coords
        .iter()
        .find(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(GeometryError::NonFiniteCoordinate { x: bad.x, y: bad.y });
    }
    if coords.first() != coords.last() {
        return Err(GeometryError::UnclosedRing { ring: index });
    }
    Ok(())
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

/// Report whether any polygon crosses itself.
///
/// Geometry too broken to inspect is reported as self-intersecting.
pub fn has_self_intersection(geometry: &MultiPolygon<f64>) -> bool {
    if let Err(err) = validate_multipolygon(geometry) {
        tracing::debug!(error = %err, "kinks check could not run, failing closed");
        return true;
    }
    geometry.0.iter().any(polygon_has_kinks)
}

fn polygon_has_kinks(polygon: &Polygon<f64>) -> bool {
    let segments: Vec<Vec<Line<f64>>> = rings(polygon).map(|r| r.lines().collect()).collect();

    for (ri, ring_a) in segments.iter().enumerate() {
        for (rj, ring_b) in segments.iter().enumerate().skip(ri) {
            for (i, a) in ring_a.iter().enumerate() {
                let start = if ri == rj { i + 1 } else { 0 };
                for (j, b) in ring_b.iter().enumerate().skip(start) {
                    if ri == rj && shares_vertex(i, j, ring_a.len()) {
                        continue;
                    }
                    if line_intersection(*a, *b).is_some() {
                        return true;
                    }
                }
            }
        }
    }

    false
}

// Consecutive segments of a closed ring, including last -> first.
fn shares_vertex(i: usize, j: usize, len: usize) -> bool {
    j == i + 1 || (i == 0 && j + 1 == len)
}

/// Construct a drawn polygon and check it for kinks.
///
/// Returns `Ok(false)` when the polygon crosses itself. Construction
/// failures are returned to the caller untouched.
pub fn validate_polygon_safety(rings: &[Vec<Coord<f64>>]) -> Result<bool, GeometryError> {
    let polygon = build_polygon(rings)?;
    if has_self_intersection(&MultiPolygon(vec![polygon])) {
        tracing::error!(key = "draw.error.intersectingPolygon", "drawn polygon intersects itself");
        return Ok(false);
    }
    Ok(true)
}

/// Union two geometries, surfacing engine failures as errors.
pub fn try_union(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, GeometryError> {
    validate_multipolygon(a).map_err(|e| GeometryError::UnionFailed(e.to_string()))?;
    validate_multipolygon(b).map_err(|e| GeometryError::UnionFailed(e.to_string()))?;

    panic::catch_unwind(AssertUnwindSafe(|| a.union(b)))
        .map_err(|payload| GeometryError::UnionFailed(panic_message(payload)))
}

/// Boolean intersects test, surfacing engine failures as errors.
pub fn try_intersects(
    zone: &MultiPolygon<f64>,
    region: &MultiPolygon<f64>,
) -> Result<bool, GeometryError> {
    validate_multipolygon(zone).map_err(|e| GeometryError::IntersectsFailed(e.to_string()))?;

    panic::catch_unwind(AssertUnwindSafe(|| zone.intersects(region)))
        .map_err(|payload| GeometryError::IntersectsFailed(panic_message(payload)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "boolean operation panicked".to_string()
    }
}

/// Fold features into one running union.
///
/// Starts from the first feature. A failed step skips that feature and
/// carries the previous accumulator forward. Returns `None` for no input.
pub fn union_fold_with<G, E, F>(features: &[G], mut union: F) -> Option<G>
where
    G: Clone,
    E: std::fmt::Display,
    F: FnMut(&G, &G) -> Result<G, E>,
{
    let (first, rest) = features.split_first()?;
    let unified = rest
        .iter()
        .enumerate()
        .fold(first.clone(), |acc, (offset, next)| match union(&acc, next) {
            Ok(merged) => merged,
            Err(err) => {
                tracing::warn!(feature = offset + 1, error = %err, "union failed, skipping feature");
                acc
            }
        });
    Some(unified)
}

/// [`union_fold_with`] using the `geo` boolean-ops engine.
pub fn union_fold(features: &[MultiPolygon<f64>]) -> Option<MultiPolygon<f64>> {
    union_fold_with(features, try_union)
}
