//! Error types for geometry construction, zone loading and telemetry parsing.

use thiserror::Error;

/// Errors raised while building or combining geometries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A closed ring needs at least four positions (first repeated last).
    #[error("polygon ring {ring} needs at least 4 positions, found {found}")]
    TooFewPositions { ring: usize, found: usize },

    /// First and last positions of a ring differ.
    #[error("polygon ring {ring} is not closed")]
    UnclosedRing { ring: usize },

    /// A polygon was built without any ring.
    #[error("polygon has no rings")]
    NoRings,

    /// NaN or infinite coordinate.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    /// Buffer distance is negative or not a number.
    #[error("invalid buffer distance: {0}")]
    InvalidBuffer(f64),

    /// The boolean-ops engine could not union two geometries.
    #[error("union failed: {0}")]
    UnionFailed(String),

    /// The intersects predicate could not be evaluated.
    #[error("intersects test failed: {0}")]
    IntersectsFailed(String),

    /// Geometry type that cannot carry an area.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// A GeoJSON position with fewer than two ordinates.
    #[error("position has {0} ordinates, expected at least 2")]
    ShortPosition(usize),
}

/// Errors raised while turning a GeoJSON feature into a restricted zone.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("feature has no geometry")]
    MissingGeometry,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("invalid zone properties: {0}")]
    Properties(#[from] serde_json::Error),

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("expected a FeatureCollection, got {0}")]
    NotACollection(&'static str),
}

/// Problems with a user drawing, each mapped to the UI message key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrawingError {
    #[error("drawing has no points")]
    EmptyPath,

    #[error("line needs more points")]
    PathTooShort,

    #[error("polygon needs more points")]
    AreaIncomplete,

    #[error("polygon intersects itself")]
    IntersectingPolygon,
}

impl DrawingError {
    pub fn i18n_key(self) -> &'static str {
        match self {
            DrawingError::EmptyPath => "draw.error.emptyPath",
            DrawingError::PathTooShort => "draw.error.pathTooShort",
            DrawingError::AreaIncomplete => "draw.error.areaIncomplete",
            DrawingError::IntersectingPolygon => "draw.error.intersectingPolygon",
        }
    }
}

/// Errors raised while decoding a positional telemetry array.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("telemetry array has {found} elements, expected {expected}")]
    TooShort { found: usize, expected: usize },

    #[error("telemetry field `{field}` (index {index}) is not {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("telemetry timestamp {0} ms is out of range")]
    InvalidTimestamp(i64),
}
