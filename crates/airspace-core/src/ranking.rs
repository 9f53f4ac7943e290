//! Display ordering for zones, conflicts and other map features.
//!
//! Ordering is four stable passes, least significant key first: altitude,
//! restriction severity, data source, plan state. Items a later pass does
//! not separate keep their earlier order. The plan-state pass only
//! reorders operation plans among the slots they already hold.

use crate::models::{Conflict, Restriction, RestrictedZone, ZoneSource};
use crate::plan_state::PlanState;
use std::cmp::Ordering;

/// Severity assigned to candidates carrying the rejecting override.
pub const REJECTING_SEVERITY: i32 = 3;

/// Source priority for a missing or unrecognized feed.
pub const UNKNOWN_SOURCE_PRIORITY: i32 = -1;

/// State priority for a missing or unrecognized plan state.
pub const UNKNOWN_STATE_PRIORITY: i32 = -1;

/// Fields the ranker reads from a candidate.
pub trait Rankable {
    fn lower_meters(&self) -> Option<f64>;
    fn upper_meters(&self) -> Option<f64>;
    fn restriction(&self) -> Restriction;
    fn is_rejecting(&self) -> bool {
        false
    }
    fn source(&self) -> Option<ZoneSource>;
    fn plan_state(&self) -> Option<PlanState>;
}

impl Rankable for RestrictedZone {
    fn lower_meters(&self) -> Option<f64> {
        self.properties.lower_meters
    }

    fn upper_meters(&self) -> Option<f64> {
        self.properties.upper_meters
    }

    fn restriction(&self) -> Restriction {
        RestrictedZone::restriction(self)
    }

    fn is_rejecting(&self) -> bool {
        RestrictedZone::is_rejecting(self)
    }

    fn source(&self) -> Option<ZoneSource> {
        self.properties.source
    }

    fn plan_state(&self) -> Option<PlanState> {
        self.properties.state
    }
}

impl Rankable for Conflict {
    fn lower_meters(&self) -> Option<f64> {
        self.lower_meters
    }

    fn upper_meters(&self) -> Option<f64> {
        self.upper_meters
    }

    fn restriction(&self) -> Restriction {
        self.restriction
    }

    fn is_rejecting(&self) -> bool {
        self.rejecting
    }

    fn source(&self) -> Option<ZoneSource> {
        self.source
    }

    fn plan_state(&self) -> Option<PlanState> {
        self.state
    }
}

/// Severity used for ordering: the override wins, otherwise the class table.
pub fn restriction_priority(restriction: Restriction, rejecting: bool) -> i32 {
    if rejecting {
        REJECTING_SEVERITY
    } else {
        restriction.severity()
    }
}

pub fn source_priority(source: Option<ZoneSource>) -> i32 {
    source.map_or(UNKNOWN_SOURCE_PRIORITY, ZoneSource::priority)
}

pub fn state_priority(state: Option<PlanState>) -> i32 {
    state.map_or(UNKNOWN_STATE_PRIORITY, PlanState::priority)
}

// Missing or NaN altitudes count as 0.
fn altitude_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(0.0)
}

/// Ascending by floor, then by ceiling.
pub fn compare_altitude<T: Rankable>(a: &T, b: &T) -> Ordering {
    altitude_or_zero(a.lower_meters())
        .total_cmp(&altitude_or_zero(b.lower_meters()))
        .then_with(|| {
            altitude_or_zero(a.upper_meters()).total_cmp(&altitude_or_zero(b.upper_meters()))
        })
}

/// Most severe first.
pub fn compare_restriction<T: Rankable>(a: &T, b: &T) -> Ordering {
    let pa = restriction_priority(a.restriction(), a.is_rejecting());
    let pb = restriction_priority(b.restriction(), b.is_rejecting());
    pb.cmp(&pa)
}

/// Highest source priority first.
pub fn compare_source<T: Rankable>(a: &T, b: &T) -> Ordering {
    source_priority(b.source()).cmp(&source_priority(a.source()))
}

fn is_plan<T: Rankable>(item: &T) -> bool {
    item.source() == Some(ZoneSource::OperationPlans)
}

/// Highest state priority first, only between two operation-plan items.
pub fn compare_plan_state<T: Rankable>(a: &T, b: &T) -> Ordering {
    if !(is_plan(a) && is_plan(b)) {
        return Ordering::Equal;
    }
    state_priority(b.plan_state()).cmp(&state_priority(a.plan_state()))
}

/// Stable sort of the operation plans by state; other items stay put.
///
/// "Equal" between a plan and a non-plan is not transitive, so the plans
/// are sorted on their own and written back into their original slots.
pub fn sort_by_plan_state<T: Rankable>(features: &mut [T]) {
    let slots: Vec<usize> = (0..features.len())
        .filter(|&i| is_plan(&features[i]))
        .collect();
    if slots.len() < 2 {
        return;
    }

    let mut wanted = slots.clone();
    wanted.sort_by(|&a, &b| compare_plan_state(&features[a], &features[b]));

    // current slot of each original index, and the reverse
    let mut position: Vec<usize> = (0..features.len()).collect();
    let mut occupant: Vec<usize> = (0..features.len()).collect();
    for (&slot, &source) in slots.iter().zip(&wanted) {
        let from = position[source];
        if from == slot {
            continue;
        }
        let displaced = occupant[slot];
        features.swap(from, slot);
        occupant[slot] = source;
        occupant[from] = displaced;
        position[source] = slot;
        position[displaced] = from;
    }
}

/// Reorder candidates in place for display.
pub fn sort_features<T: Rankable>(features: &mut [T]) {
    features.sort_by(compare_altitude);
    features.sort_by(compare_restriction);
    features.sort_by(compare_source);
    sort_by_plan_state(features);
}
