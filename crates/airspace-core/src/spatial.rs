//! Spherical geodesy and coordinate canonicalization.
//!
//! Coordinates follow the GeoJSON axis order: `x` is longitude, `y` is latitude.

use geo::Coord;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Mean earth radius in kilometers, used by the buffering routines.
pub const EARTH_RADIUS_KM: f64 = EARTH_RADIUS_M / 1000.0;

/// Map any real value into `[0, limit)`.
///
/// The inner remainder keeps the sign of `value`, so the result is shifted by
/// `limit` and reduced once more to land in range for negative inputs too.
pub fn normalize_cyclic(value: f64, limit: f64) -> f64 {
    ((value % limit) + limit) % limit
}

/// Wrap a longitude into `[-180, 180)`.
pub fn wrap_longitude(lng: f64) -> f64 {
    normalize_cyclic(lng + 180.0, 360.0) - 180.0
}

/// Canonicalize a drawn or received coordinate.
///
/// Only the longitude is wrapped. Latitude passes through untouched, even
/// outside `[-90, 90]`.
pub fn normalize_coordinate(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: wrap_longitude(coord.x),
        y: coord.y,
    }
}

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Destination reached from a start point after travelling an angular
/// distance (radians of arc) along a bearing.
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn destination(lat: f64, lon: f64, angular_distance: f64, bearing_rad: f64) -> (f64, f64) {
    if angular_distance.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Offset a position by distance (meters) and bearing (radians, 0 = north).
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    destination(lat, lon, distance_m / EARTH_RADIUS_M, bearing_rad)
}

/// Great-circle midpoint of two coordinates.
pub fn midpoint(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let distance_m = haversine_distance(a.y, a.x, b.y, b.x);
    let heading = bearing(a.y, a.x, b.y, b.x);
    let (lat, lon) = offset_by_bearing(a.y, a.x, distance_m / 2.0, heading);
    Coord { x: lon, y: lat }
}
