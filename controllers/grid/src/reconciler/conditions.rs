//! Condition bookkeeping with `meta.SetStatusCondition` semantics.

use chrono::Utc;
use crds::GridCondition;

/// Reason used while the first reconcile is running.
pub const REASON_RECONCILING: &str = "Reconciling";

/// Reason used for everything the job manager reports.
pub const REASON_JOB_MANAGE: &str = "JobManage";

/// Insert or update `new` in `conditions`, keyed by type.
///
/// An existing record keeps its `lastTransitionTime` unless its status
/// changes. Returns true if anything changed.
pub fn set_condition(conditions: &mut Vec<GridCondition>, mut new: GridCondition) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_) else {
        if new.last_transition_time.is_none() {
            new.last_transition_time = Some(Utc::now());
        }
        conditions.push(new);
        return true;
    };

    let mut changed = false;
    if existing.status != new.status {
        existing.status = new.status;
        existing.last_transition_time = new.last_transition_time.or_else(|| Some(Utc::now()));
        changed = true;
    }
    if existing.reason != new.reason {
        existing.reason = new.reason;
        changed = true;
    }
    if existing.message != new.message {
        existing.message = new.message;
        changed = true;
    }
    if existing.observed_generation != new.observed_generation {
        existing.observed_generation = new.observed_generation;
        changed = true;
    }
    changed
}

/// Condition of the given type, if present.
pub fn find_condition<'a>(conditions: &'a [GridCondition], type_: &str) -> Option<&'a GridCondition> {
    conditions.iter().find(|c| c.type_ == type_)
}
