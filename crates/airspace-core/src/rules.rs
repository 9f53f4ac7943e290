//! Tunable thresholds for drawing, buffering and telemetry handling.

use serde::{Deserialize, Serialize};

/// Configuration for corridor building and drawing checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirspaceRules {
    /// Buffer applied to a drawing when none is given, in meters
    pub default_buffer_m: f64,
    /// Arc segments per quarter circle when buffering
    pub buffer_steps: usize,
    /// Vertices a polygon drawing needs before it encloses an area
    pub min_polygon_vertices: usize,
    /// Vertices a line drawing needs before it forms a path
    pub min_line_vertices: usize,
    /// Telemetry older than this is dropped (seconds)
    pub telemetry_staleness_secs: i64,
    /// Regulatory altitudes a requested height snaps to, in meters
    pub altitude_snap_m: Vec<f64>,
}

impl Default for AirspaceRules {
    fn default() -> Self {
        Self {
            default_buffer_m: 50.0,
            buffer_steps: 8,
            min_polygon_vertices: 3,
            min_line_vertices: 2,
            telemetry_staleness_secs: 60,
            altitude_snap_m: vec![10.0, 30.0, 50.0, 80.0, 100.0],
        }
    }
}

impl AirspaceRules {
    pub fn telemetry_staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.telemetry_staleness_secs)
    }

    /// Closest snap altitude; the earlier value wins a tie.
    /// Returns the input unchanged when no snap values are configured.
    pub fn snap_altitude(&self, altitude_m: f64) -> f64 {
        self.altitude_snap_m
            .iter()
            .copied()
            .reduce(|best, candidate| {
                if (candidate - altitude_m).abs() < (best - altitude_m).abs() {
                    candidate
                } else {
                    best
                }
            })
            .unwrap_or(altitude_m)
    }
}
