pub mod conflict;
pub mod error;
pub mod geometry;
pub mod models;
pub mod plan_state;
pub mod ranking;
pub mod route_area;
pub mod rules;
pub mod spatial;
pub mod telemetry;

pub use conflict::{check_violation, ConflictDetector};
pub use error::{DrawingError, GeometryError, TelemetryError, ZoneError};
pub use geometry::{
    point_in_polygon, point_in_polygon_feature, union_fold, validate_polygon_safety,
};
pub use models::{
    load_zones, zones_from_collection, AltitudeRef, Conflict, DrawingMode, Position,
    Restriction, RestrictedZone, ZoneProperties, ZoneSource,
};
pub use plan_state::{
    get_computed_status, translate_plan_error, ComputedStatus, OperationPlan, PlanState,
};
pub use ranking::{sort_features, Rankable};
pub use route_area::{
    calculate_midpoints, create_route_area, create_route_area_with,
    create_route_area_with_midpoints, validate_drawing, Corridor, DrawingState, RouteArea,
};
pub use rules::AirspaceRules;
pub use spatial::{haversine_distance, normalize_coordinate};
pub use telemetry::{parse_telemetry_array, prune_stale, TelemetryData, Velocity};
