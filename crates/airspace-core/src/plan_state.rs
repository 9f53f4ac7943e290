//! Lifecycle flags derived from operation plan snapshots.
//!
//! Plans are fetched read-only. Every flag is a pure function of the
//! snapshot and is recomputed on each read; the flags are independent
//! predicates and may overlap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary state of an operation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanState {
    Proposed,
    Approved,
    Authorized,
    Activated,
    TakeoffRequested,
    TakeoffGranted,
    Closed,
    Denied,
    Timeout,
    Error,
    #[serde(other)]
    Unknown,
}

impl PlanState {
    /// Display priority; states without an entry get -1.
    pub fn priority(self) -> i32 {
        match self {
            PlanState::Activated => 5,
            PlanState::TakeoffRequested => 4,
            PlanState::Approved => 3,
            PlanState::Proposed => 2,
            PlanState::Closed => 1,
            _ => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClosureReason {
    Nominal,
    Canceled,
    Withdrawn,
    Rejected,
    Revoked,
    Timeout,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantState {
    Granted,
    Denied,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Authorization or activation sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(default)]
    pub state: Option<GrantState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeOp {
    /// Missing start times never match the plan's own
    #[serde(default)]
    pub time_begin: Option<DateTime<Utc>>,
}

/// Operation plan record as served by the planning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPlan {
    #[serde(default)]
    pub operation_plan_id: Option<String>,
    pub state: PlanState,
    #[serde(default)]
    pub closure_reason: Option<ClosureReason>,
    #[serde(default)]
    pub authorization: Option<Grant>,
    #[serde(default)]
    pub activation: Option<Grant>,
    #[serde(default, rename = "alternativeOPs")]
    pub alternative_ops: Option<Vec<AlternativeOp>>,
    #[serde(default)]
    pub conflicts: Option<Vec<serde_json::Value>>,
    pub time_begin: DateTime<Utc>,
}

impl OperationPlan {
    pub fn new(state: PlanState, time_begin: DateTime<Utc>) -> Self {
        Self {
            operation_plan_id: None,
            state,
            closure_reason: None,
            authorization: None,
            activation: None,
            alternative_ops: None,
            conflicts: None,
            time_begin,
        }
    }

    fn authorization_state(&self) -> Option<GrantState> {
        self.authorization.as_ref().and_then(|g| g.state)
    }

    fn activation_state(&self) -> Option<GrantState> {
        self.activation.as_ref().and_then(|g| g.state)
    }
}

/// Flags shown for a plan. Not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStatus {
    pub completed: bool,
    pub cancelled: bool,
    pub rejected: bool,
    pub active: bool,
    pub pending: bool,
}

/// Closed nominally, or closed after both grants were given.
pub fn is_completed(plan: &OperationPlan) -> bool {
    if plan.state != PlanState::Closed {
        return false;
    }
    plan.closure_reason == Some(ClosureReason::Nominal)
        || (plan.authorization_state() == Some(GrantState::Granted)
            && plan.activation_state() == Some(GrantState::Granted))
}

/// Rejected by time-shifted alternatives, a denial with conflicts, or a
/// terminal timeout/error. Can hold for states other than `Closed`.
pub fn is_rejected(plan: &OperationPlan) -> bool {
    let time_mismatch = plan
        .alternative_ops
        .as_deref()
        .is_some_and(|alts| alts.iter().any(|alt| alt.time_begin != Some(plan.time_begin)));
    if time_mismatch {
        return true;
    }

    let denied_with_conflicts = plan.state == PlanState::Denied
        && plan.conflicts.as_deref().is_some_and(|c| !c.is_empty());
    if denied_with_conflicts {
        return true;
    }

    matches!(plan.state, PlanState::Timeout | PlanState::Error)
}

/// Explicitly cancelled or withdrawn, or closed without completing and
/// without being rejected.
pub fn is_cancelled(plan: &OperationPlan) -> bool {
    if matches!(
        plan.closure_reason,
        Some(ClosureReason::Canceled) | Some(ClosureReason::Withdrawn)
    ) {
        return true;
    }
    plan.state == PlanState::Closed && !is_completed(plan) && !is_rejected(plan)
}

pub fn is_active(plan: &OperationPlan) -> bool {
    plan.state == PlanState::Activated
}

/// Awaiting approval or activation.
pub fn is_pending(plan: &OperationPlan) -> bool {
    matches!(plan.state, PlanState::Proposed | PlanState::Approved)
}

pub fn get_computed_status(plan: &OperationPlan) -> ComputedStatus {
    ComputedStatus {
        completed: is_completed(plan),
        cancelled: is_cancelled(plan),
        rejected: is_rejected(plan),
        active: is_active(plan),
        pending: is_pending(plan),
    }
}

/// Map a backend error message onto a UI message key.
pub fn translate_plan_error(message: &str) -> Option<&'static str> {
    if message.contains("end time has been exceeded") {
        return Some("operationplan.exceeded");
    }
    if message.contains("VLOS") && message.contains("bounding box") {
        return Some("operationplan.vlos_bbox_exceeded");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn begin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
    }

    fn plan(state: PlanState) -> OperationPlan {
        OperationPlan::new(state, begin())
    }

    #[test]
    fn closed_nominal_is_completed() {
        let mut p = plan(PlanState::Closed);
        p.closure_reason = Some(ClosureReason::Nominal);
        let status = get_computed_status(&p);
        assert!(status.completed);
        assert!(!status.cancelled);
        assert!(!status.rejected);
    }

    #[test]
    fn closed_with_both_grants_is_completed() {
        let mut p = plan(PlanState::Closed);
        p.authorization = Some(Grant { state: Some(GrantState::Granted) });
        p.activation = Some(Grant { state: Some(GrantState::Granted) });
        assert!(is_completed(&p));

        p.activation = Some(Grant { state: Some(GrantState::Pending) });
        assert!(!is_completed(&p));
    }

    #[test]
    fn timeout_is_only_rejected() {
        let status = get_computed_status(&plan(PlanState::Timeout));
        assert_eq!(
            status,
            ComputedStatus {
                rejected: true,
                ..ComputedStatus::default()
            }
        );
        assert!(is_rejected(&plan(PlanState::Error)));
    }

    #[test]
    fn closed_without_reason_is_cancelled() {
        let mut p = plan(PlanState::Closed);
        p.authorization = Some(Grant { state: Some(GrantState::Pending) });
        let status = get_computed_status(&p);
        assert!(status.cancelled);
        assert!(!status.completed);
        assert!(!status.rejected);
    }

    #[test]
    fn withdrawn_is_cancelled_in_any_state() {
        let mut p = plan(PlanState::Approved);
        p.closure_reason = Some(ClosureReason::Withdrawn);
        let status = get_computed_status(&p);
        assert!(status.cancelled);
        assert!(status.pending);
    }

    #[test]
    fn shifted_alternative_rejects() {
        let mut p = plan(PlanState::Proposed);
        p.alternative_ops = Some(vec![AlternativeOp { time_begin: Some(begin()) }]);
        assert!(!is_rejected(&p));

        p.alternative_ops = Some(vec![
            AlternativeOp { time_begin: Some(begin()) },
            AlternativeOp {
                time_begin: Some(begin() + chrono::Duration::minutes(15)),
            },
        ]);
        assert!(is_rejected(&p));
        assert!(is_pending(&p));
    }

    #[test]
    fn denied_needs_conflicts_to_reject() {
        let mut p = plan(PlanState::Denied);
        assert!(!is_rejected(&p));
        p.conflicts = Some(vec![]);
        assert!(!is_rejected(&p));
        p.conflicts = Some(vec![json!({ "id": "c1" })]);
        assert!(is_rejected(&p));
    }

    #[test]
    fn closed_rejected_plan_is_not_cancelled() {
        let mut p = plan(PlanState::Closed);
        p.alternative_ops = Some(vec![AlternativeOp {
            time_begin: Some(begin() + chrono::Duration::hours(1)),
        }]);
        let status = get_computed_status(&p);
        assert!(status.rejected);
        assert!(!status.cancelled);
    }

    #[test]
    fn active_flag() {
        assert!(get_computed_status(&plan(PlanState::Activated)).active);
        assert!(!is_active(&plan(PlanState::TakeoffGranted)));
    }

    #[test]
    fn deserializes_backend_record() {
        let p: OperationPlan = serde_json::from_value(json!({
            "operationPlanId": "op-1",
            "state": "TAKEOFFREQUESTED",
            "closureReason": null,
            "authorization": { "state": "GRANTED" },
            "activation": { "state": null },
            "alternativeOPs": [],
            "timeBegin": "2026-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(p.state, PlanState::TakeoffRequested);
        assert_eq!(p.state.priority(), 4);
        assert!(!is_rejected(&p));
    }

    #[test]
    fn unknown_closure_reason_still_derives_status() {
        let p: OperationPlan = serde_json::from_value(json!({
            "state": "CLOSED",
            "closureReason": "EXPIRED",
            "timeBegin": "2026-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(p.closure_reason, Some(ClosureReason::Unknown));
        let status = get_computed_status(&p);
        assert!(!status.completed);
        assert!(status.cancelled);
    }

    #[test]
    fn unknown_grant_state_is_not_granted() {
        let p: OperationPlan = serde_json::from_value(json!({
            "state": "CLOSED",
            "authorization": { "state": "REVOKED" },
            "activation": { "state": "GRANTED" },
            "timeBegin": "2026-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            p.authorization,
            Some(Grant {
                state: Some(GrantState::Unknown)
            })
        );
        assert!(!is_completed(&p));
    }

    #[test]
    fn alternative_without_start_time_rejects() {
        let p: OperationPlan = serde_json::from_value(json!({
            "state": "PROPOSED",
            "alternativeOPs": [{}],
            "timeBegin": "2026-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(p.alternative_ops.as_deref().map(<[_]>::len), Some(1));
        assert!(is_rejected(&p));
    }

    #[test]
    fn state_priority_table() {
        assert_eq!(PlanState::Activated.priority(), 5);
        assert_eq!(PlanState::Closed.priority(), 1);
        assert_eq!(PlanState::Denied.priority(), -1);
        assert_eq!(PlanState::Unknown.priority(), -1);
    }

    #[test]
    fn translates_known_errors() {
        assert_eq!(
            translate_plan_error("Operation end time has been exceeded"),
            Some("operationplan.exceeded")
        );
        assert_eq!(
            translate_plan_error("VLOS operation exceeds bounding box"),
            Some("operationplan.vlos_bbox_exceeded")
        );
        assert_eq!(translate_plan_error("VLOS only"), None);
    }
}
