//! Conflict detection between drawn corridors, live positions and
//! restricted zones.
//!
//! Corridor checks are 2D: a corridor conflicts with every zone whose
//! geometry intersects it, hidden or not. Point checks are 3D and skip
//! hidden zones.

use crate::error::GeometryError;
use crate::geometry::{point_in_polygon_feature, try_intersects, union_fold};
use crate::models::{Conflict, Position, RestrictedZone};
use crate::ranking::sort_features;
use crate::route_area::{create_route_area_with, Corridor, DrawingState};
use crate::rules::AirspaceRules;
use geo::Coord;

/// Holds the current zone snapshot and answers containment queries.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    zones: Vec<RestrictedZone>,
}

impl ConflictDetector {
    pub fn new(zones: Vec<RestrictedZone>) -> Self {
        Self { zones }
    }

    /// Replace the zone snapshot.
    pub fn set_zones(&mut self, zones: Vec<RestrictedZone>) {
        self.zones = zones;
    }

    pub fn zones(&self) -> &[RestrictedZone] {
        &self.zones
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Zones whose geometry intersects the corridor, in snapshot order.
    ///
    /// Corridor pieces are unioned first. A zone whose intersection test
    /// fails is logged and counted as not intersecting.
    pub fn intersecting_zones(&self, corridor: &Corridor) -> Vec<RestrictedZone> {
        let Some(region) = union_fold(corridor.features()) else {
            return Vec::new();
        };

        self.zones
            .iter()
            .filter(|zone| match try_intersects(&zone.geometry, &region) {
                Ok(hit) => hit,
                Err(err) => {
                    tracing::warn!(
                        zone = zone.identifier().unwrap_or("<unnamed>"),
                        error = %err,
                        "intersection test failed, treating zone as clear"
                    );
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Build a corridor from the drawing and return the zones it touches,
    /// ranked for display.
    pub fn check_route(
        &self,
        state: &DrawingState,
        rules: &AirspaceRules,
    ) -> Result<Vec<RestrictedZone>, GeometryError> {
        let corridor = create_route_area_with(
            &state.points(),
            state.drawing_mode,
            state.buffer_m(rules),
            rules,
        )?;
        let mut zones = self.intersecting_zones(&corridor);
        sort_features(&mut zones);

        tracing::info!(
            mode = ?state.drawing_mode,
            pieces = corridor.features().len(),
            conflicts = zones.len(),
            "route checked"
        );
        Ok(zones)
    }

    /// Visible zones containing the coordinate, ignoring altitude.
    pub fn zones_at_point(&self, point: Coord<f64>) -> Vec<&RestrictedZone> {
        self.zones
            .iter()
            .filter(|zone| !zone.is_hidden() && point_in_polygon_feature(point, &zone.geometry))
            .collect()
    }

    /// Every visible zone the position violates, ranked for display.
    pub fn violations_at(&self, position: &Position) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .zones
            .iter()
            .filter_map(|zone| check_violation(position, zone))
            .collect();
        sort_features(&mut conflicts);

        if !conflicts.is_empty() {
            tracing::debug!(
                lat = position.lat,
                lng = position.lng,
                altitude_m = position.altitude_m,
                conflicts = conflicts.len(),
                "position inside restricted airspace"
            );
        }
        conflicts
    }
}

/// Test one position against one zone.
///
/// A conflict needs the position inside the zone horizontally and its
/// altitude within `[lower, upper]`. Hidden zones never conflict.
pub fn check_violation(position: &Position, zone: &RestrictedZone) -> Option<Conflict> {
    if zone.is_hidden() || !point_in_polygon_feature(position.coord(), &zone.geometry) {
        return None;
    }

    let lower_m = zone.lower_limit_m();
    let upper_m = zone.upper_limit_m();
    let altitude = position.altitude_m;
    if altitude < lower_m || upper_m.is_some_and(|upper| altitude > upper) {
        return None;
    }

    let restriction = zone.restriction();
    Some(Conflict {
        zone_id: zone.properties.identifier.clone(),
        zone_name: zone.properties.name.clone(),
        restriction,
        severity: restriction.severity(),
        lower_m,
        upper_m,
        source: zone.properties.source,
        state: zone.properties.state,
        rejecting: zone.is_rejecting(),
        lower_meters: zone.properties.lower_meters,
        upper_meters: zone.properties.upper_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrawingMode, Restriction, ZoneProperties, ZoneSource};
    use geo::{polygon, MultiPolygon};
    use serde_json::json;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn zone(geometry: MultiPolygon<f64>, properties: serde_json::Value) -> RestrictedZone {
        let properties: ZoneProperties = serde_json::from_value(properties).unwrap();
        RestrictedZone::new(geometry, properties)
    }

    fn line_through(points: &[[f64; 2]]) -> DrawingState {
        DrawingState {
            current_drawing: points.to_vec(),
            drawing_mode: DrawingMode::Line,
            buffer: Some(50.0),
        }
    }

    #[test]
    fn test_position_inside_band_conflicts() {
        let z = zone(
            square(10.0, 59.0, 0.1),
            json!({ "identifier": "Z1", "lower": "AGL", "upper": 100, "restriction": "PROHIBITED" }),
        );

        let conflict = check_violation(&Position::new(59.05, 10.05, 50.0), &z).unwrap();
        assert_eq!(conflict.zone_id.as_deref(), Some("Z1"));
        assert_eq!(conflict.severity, 3);
        assert_eq!(conflict.lower_m, 0.0);
        assert_eq!(conflict.upper_m, Some(100.0));

        assert!(check_violation(&Position::new(59.05, 10.05, 150.0), &z).is_none());
        assert!(check_violation(&Position::new(59.5, 10.05, 50.0), &z).is_none());
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let z = zone(square(0.0, 0.0, 1.0), json!({ "lower": 30, "upper": 120 }));
        assert!(check_violation(&Position::new(0.5, 0.5, 30.0), &z).is_some());
        assert!(check_violation(&Position::new(0.5, 0.5, 120.0), &z).is_some());
        assert!(check_violation(&Position::new(0.5, 0.5, 29.9), &z).is_none());
    }

    #[test]
    fn test_missing_ceiling_is_unbounded() {
        let z = zone(square(0.0, 0.0, 1.0), json!({ "restriction": "CONDITIONAL" }));
        let conflict = check_violation(&Position::new(0.5, 0.5, 10_000.0), &z).unwrap();
        assert_eq!(conflict.upper_m, None);
        assert_eq!(conflict.severity, 1);
    }

    #[test]
    fn test_hidden_zones_only_skipped_for_points() {
        let hidden = zone(square(10.0, 59.0, 0.1), json!({ "identifier": "H", "hidden": true }));
        let detector = ConflictDetector::new(vec![hidden]);

        assert!(detector.violations_at(&Position::new(59.05, 10.05, 0.0)).is_empty());
        assert!(detector.zones_at_point(Coord { x: 10.05, y: 59.05 }).is_empty());

        let route = line_through(&[[10.0, 58.95], [10.05, 59.05]]);
        let hits = detector.check_route(&route, &AirspaceRules::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier(), Some("H"));
    }

    #[test]
    fn test_corridor_misses_distant_zone() {
        let detector = ConflictDetector::new(vec![zone(square(20.0, 50.0, 0.1), json!({}))]);
        let route = line_through(&[[10.0, 59.0], [10.1, 59.1]]);
        let hits = detector.check_route(&route, &AirspaceRules::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_buffer_reaches_zone_beside_path() {
        // zone edge sits ~30 m east of the path at 10.0
        let offset_deg = 30.0 / (111_320.0 * 59.0_f64.to_radians().cos());
        let detector = ConflictDetector::new(vec![zone(
            square(10.0 + offset_deg, 59.0, 0.01),
            json!({ "identifier": "near" }),
        )]);
        let route = line_through(&[[10.0, 59.0], [10.0, 59.01]]);

        let hits = detector.check_route(&route, &AirspaceRules::default()).unwrap();
        assert_eq!(hits.len(), 1);

        let narrow = DrawingState {
            buffer: Some(10.0),
            ..route
        };
        assert!(detector
            .check_route(&narrow, &AirspaceRules::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_empty_drawing_has_no_conflicts() {
        let detector = ConflictDetector::new(vec![zone(square(0.0, 0.0, 1.0), json!({}))]);
        assert!(detector.intersecting_zones(&Corridor::empty()).is_empty());
        let hits = detector
            .check_route(&line_through(&[]), &AirspaceRules::default())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_malformed_zone_is_treated_as_clear() {
        let broken = RestrictedZone::new(
            MultiPolygon(vec![geo::Polygon::new(
                geo::LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
                vec![],
            )]),
            ZoneProperties::default(),
        );
        let good = zone(square(0.0, 0.0, 1.0), json!({ "identifier": "ok" }));
        let detector = ConflictDetector::new(vec![broken, good]);

        let route = line_through(&[[0.5, 0.5], [0.6, 0.6]]);
        let hits = detector.check_route(&route, &AirspaceRules::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier(), Some("ok"));
    }

    #[test]
    fn test_violations_are_ranked() {
        let detector = ConflictDetector::new(vec![
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "cond", "restriction": "CONDITIONAL" })),
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "drawn", "source": "coordinate" })),
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "prohibited", "restriction": "PROHIBITED" })),
        ]);

        let ids: Vec<_> = detector
            .violations_at(&Position::new(0.5, 0.5, 10.0))
            .into_iter()
            .map(|c| c.zone_id.unwrap())
            .collect();
        assert_eq!(ids, ["drawn", "prohibited", "cond"]);
    }

    #[test]
    fn test_violations_rank_like_zones() {
        let zones = vec![
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "cond", "restriction": "CONDITIONAL" })),
            zone(
                square(0.0, 0.0, 1.0),
                json!({ "identifier": "rej", "restriction": "NO_RESTRICTION", "_rejecting": true }),
            ),
        ];
        let mut ranked_zones = zones.clone();
        sort_features(&mut ranked_zones);
        let zone_ids: Vec<_> = ranked_zones.iter().filter_map(|z| z.identifier()).collect();
        assert_eq!(zone_ids, ["rej", "cond"]);

        let conflicts = ConflictDetector::new(zones).violations_at(&Position::new(0.5, 0.5, 10.0));
        let conflict_ids: Vec<_> = conflicts.iter().filter_map(|c| c.zone_id.as_deref()).collect();
        assert_eq!(conflict_ids, ["rej", "cond"]);
        assert!(conflicts[0].rejecting);
        assert_eq!(conflicts[0].severity, 0);
    }

    #[test]
    fn test_violations_rank_by_zone_altitude_fields() {
        // resolved bands would put "b" first; lowerMeters puts "a" first
        let detector = ConflictDetector::new(vec![
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "b", "lower": 0, "lowerMeters": 40 })),
            zone(square(0.0, 0.0, 1.0), json!({ "identifier": "a", "lower": 20, "lowerMeters": 10 })),
        ]);
        let ids: Vec<_> = detector
            .violations_at(&Position::new(0.5, 0.5, 30.0))
            .into_iter()
            .filter_map(|c| c.zone_id)
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_zones_at_point_ignores_altitude() {
        let detector = ConflictDetector::new(vec![zone(
            square(0.0, 0.0, 1.0),
            json!({ "lower": 500, "restriction": "REQ_AUTHORISATION", "source": "operationplans" }),
        )]);
        let found = detector.zones_at_point(Coord { x: 0.5, y: 0.5 });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].restriction(), Restriction::RequiresAuthorisation);
        assert_eq!(found[0].properties.source, Some(ZoneSource::OperationPlans));
        assert!(detector.violations_at(&Position::new(0.5, 0.5, 100.0)).is_empty());
    }
}
