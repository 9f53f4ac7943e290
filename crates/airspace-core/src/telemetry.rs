//! Live aircraft telemetry.
//!
//! The tracking feed sends each report as a fixed-length positional array
//! instead of a keyed object:
//!
//! `[id, name, createdAt(ms), latitude, longitude, {latitude, longitude},
//! altitudeMeters, type, icon, opacity]`

use crate::error::TelemetryError;
use crate::models::Position;
use crate::spatial::{bearing, wrap_longitude};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const TELEMETRY_FIELDS: usize = 10;

const FIELD_NAMES: [&str; TELEMETRY_FIELDS] = [
    "id",
    "name",
    "createdAt",
    "latitude",
    "longitude",
    "velocity",
    "altitudeMeters",
    "type",
    "icon",
    "opacity",
];

/// Velocity in meters per second, split by axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub latitude: f64,
    pub longitude: f64,
}

/// One decoded telemetry report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub velocity: Velocity,
    pub altitude_meters: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub icon: String,
    pub opacity: f64,
}

/// Decode a positional telemetry array.
///
/// Extra trailing elements are ignored. Null text fields read as empty
/// text; every numeric field is required.
pub fn parse_telemetry_array(data: &[Value]) -> Result<TelemetryData, TelemetryError> {
    if data.len() < TELEMETRY_FIELDS {
        return Err(TelemetryError::TooShort {
            found: data.len(),
            expected: TELEMETRY_FIELDS,
        });
    }

    let created_ms = data[2]
        .as_i64()
        .or_else(|| data[2].as_f64().map(|ms| ms as i64))
        .ok_or_else(|| invalid(2, "a number"))?;
    let created_at = DateTime::from_timestamp_millis(created_ms)
        .ok_or(TelemetryError::InvalidTimestamp(created_ms))?;

    let velocity: Velocity =
        serde_json::from_value(data[5].clone()).map_err(|_| invalid(5, "a velocity object"))?;

    Ok(TelemetryData {
        id: identifier(&data[0]).ok_or_else(|| invalid(0, "a string or number"))?,
        name: optional_text(&data[1]).ok_or_else(|| invalid(1, "a string"))?,
        created_at,
        latitude: number(data, 3)?,
        longitude: number(data, 4)?,
        velocity,
        altitude_meters: number(data, 6)?,
        kind: optional_text(&data[7]).ok_or_else(|| invalid(7, "a string"))?,
        icon: optional_text(&data[8]).ok_or_else(|| invalid(8, "a string"))?,
        opacity: number(data, 9)?,
    })
}

fn invalid(index: usize, expected: &'static str) -> TelemetryError {
    TelemetryError::InvalidField {
        index,
        field: FIELD_NAMES[index],
        expected,
    }
}

fn number(data: &[Value], index: usize) -> Result<f64, TelemetryError> {
    data[index]
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(index, "a finite number"))
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

impl TelemetryData {
    /// Ground speed in km/h, rounded.
    pub fn speed_kmh(&self) -> i64 {
        (3.6 * self.velocity.latitude.hypot(self.velocity.longitude)).round() as i64
    }

    /// Heading in degrees (-180..=180, 0 = north) from the current position
    /// towards position + velocity. Zero while the aircraft is not moving.
    pub fn bearing_deg(&self) -> f64 {
        if self.speed_kmh() <= 0 {
            return 0.0;
        }
        bearing(
            self.latitude,
            self.longitude,
            self.latitude + self.velocity.latitude,
            self.longitude + self.velocity.longitude,
        )
        .to_degrees()
    }

    /// Position for zone containment checks.
    pub fn position(&self) -> Position {
        Position::new(self.latitude, wrap_longitude(self.longitude), self.altitude_meters)
    }

    /// Map sprite; unknown icons fall back to the generic drone sprite.
    pub fn sprite(&self) -> &'static str {
        match self.icon.as_str() {
            "plane" => "plane",
            "plane-emergency" => "plane-emergency",
            "uas-emergency" => "uas-emergency",
            _ => "uas",
        }
    }

    /// Heading label such as `"(045°)"`.
    pub fn heading_label(&self) -> String {
        let heading = self.bearing_deg().rem_euclid(360.0).round() as i64 % 360;
        format!("({heading:03}°)")
    }

    pub fn is_stale(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        now - self.created_at > staleness
    }

    /// GeoJSON point feature for the map layer.
    pub fn to_feature(&self) -> geojson::Feature {
        let properties = json!({
            "id": self.id,
            "name": self.name,
            "speed": self.speed_kmh(),
            "alt": self.altitude_meters,
            "type": self.kind,
            "icon": self.sprite(),
            "opacity": self.opacity,
            "bearing": self.bearing_deg(),
            "label": self.heading_label(),
        });
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                self.longitude,
                self.latitude,
            ]))),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }
}

/// Drop records older than `staleness`. Returns how many were removed.
pub fn prune_stale(records: &mut Vec<TelemetryData>, now: DateTime<Utc>, staleness: Duration) -> usize {
    let before = records.len();
    records.retain(|record| !record.is_stale(now, staleness));
    let removed = before - records.len();
    if removed > 0 {
        tracing::debug!(removed, remaining = records.len(), "pruned stale telemetry");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AirspaceRules;
    use chrono::TimeZone;

    fn raw(velocity: Value) -> Vec<Value> {
        vec![
            json!("abc-1"),
            json!("Drone 1"),
            json!(1_777_629_600_000_i64),
            json!(59.43),
            json!(24.75),
            velocity,
            json!(42.5),
            json!("uas"),
            json!("uas-emergency"),
            json!(1.0),
        ]
    }

    #[test]
    fn parses_positional_array() {
        let t = parse_telemetry_array(&raw(json!({ "latitude": 3.0, "longitude": 4.0 }))).unwrap();
        assert_eq!(t.id, "abc-1");
        assert_eq!(t.name, "Drone 1");
        assert_eq!(t.created_at.timestamp_millis(), 1_777_629_600_000);
        assert_eq!(t.altitude_meters, 42.5);
        assert_eq!(t.kind, "uas");
        assert_eq!(t.sprite(), "uas-emergency");
        // |v| = 5 m/s
        assert_eq!(t.speed_kmh(), 18);
    }

    #[test]
    fn short_array_is_rejected() {
        let mut data = raw(json!({ "latitude": 0.0, "longitude": 0.0 }));
        data.truncate(7);
        assert_eq!(
            parse_telemetry_array(&data),
            Err(TelemetryError::TooShort {
                found: 7,
                expected: 10
            })
        );
    }

    #[test]
    fn mistyped_field_names_the_field() {
        let mut data = raw(json!({ "latitude": 0.0, "longitude": 0.0 }));
        data[3] = json!("north");
        let err = parse_telemetry_array(&data).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidField {
                index: 3,
                field: "latitude",
                ..
            }
        ));

        let mut data = raw(json!(null));
        data[0] = json!(17);
        assert!(matches!(
            parse_telemetry_array(&data),
            Err(TelemetryError::InvalidField { index: 5, .. })
        ));
    }

    #[test]
    fn stationary_aircraft_has_zero_bearing() {
        let t = parse_telemetry_array(&raw(json!({ "latitude": 0.1, "longitude": 0.0 }))).unwrap();
        assert_eq!(t.speed_kmh(), 0);
        assert_eq!(t.bearing_deg(), 0.0);
        assert_eq!(t.heading_label(), "(000°)");
    }

    #[test]
    fn bearing_follows_velocity() {
        let north = parse_telemetry_array(&raw(json!({ "latitude": 0.001, "longitude": 0.0 })));
        // 0.001 m/s rounds to 0 km/h
        assert_eq!(north.unwrap().bearing_deg(), 0.0);

        let east = parse_telemetry_array(&raw(json!({ "latitude": 0.0, "longitude": 10.0 }))).unwrap();
        assert!(east.bearing_deg() > 45.0 && east.bearing_deg() < 135.0);

        let west = parse_telemetry_array(&raw(json!({ "latitude": 0.0, "longitude": -10.0 }))).unwrap();
        assert!(west.bearing_deg() < 0.0);
        let label = west.heading_label();
        assert!(label.starts_with("(2") || label.starts_with("(3"), "{label}");
    }

    #[test]
    fn position_wraps_longitude() {
        let mut data = raw(json!({ "latitude": 0.0, "longitude": 0.0 }));
        data[4] = json!(190.0);
        let p = parse_telemetry_array(&data).unwrap().position();
        assert!((p.lng - -170.0).abs() < 1e-9);
        assert_eq!(p.altitude_m, 42.5);
    }

    #[test]
    fn prunes_records_past_staleness() {
        let fresh = parse_telemetry_array(&raw(json!({ "latitude": 0.0, "longitude": 0.0 }))).unwrap();
        let mut old = fresh.clone();
        old.id = "old".into();
        old.created_at = fresh.created_at - Duration::seconds(90);

        let now = fresh.created_at + Duration::seconds(30);
        let mut records = vec![old, fresh];
        let staleness = AirspaceRules::default().telemetry_staleness();
        assert_eq!(prune_stale(&mut records, now, staleness), 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "abc-1");
    }

    #[test]
    fn feature_carries_display_properties() {
        let t = parse_telemetry_array(&raw(json!({ "latitude": 3.0, "longitude": 4.0 }))).unwrap();
        let feature = t.to_feature();
        let props = feature.properties.unwrap();
        assert_eq!(props["speed"], json!(18));
        assert_eq!(props["icon"], json!("uas-emergency"));
        assert_eq!(
            Utc.timestamp_millis_opt(1_777_629_600_000).unwrap(),
            t.created_at
        );
    }
}
