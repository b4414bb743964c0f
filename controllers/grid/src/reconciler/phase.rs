//! Grid lifecycle state machine.
//!
//! ```text
//! (empty) -> Initializing -> Initialized -> Waiting -> Progressing -> Finalising -> Succeeded
//!                 any non-terminal phase -> Failed | Terminating -> Terminated
//!                 Failed | Succeeded -> Initializing   (spec changed)
//! ```
//!
//! Only the edges driven by a trigger below are entered by the controller
//! today. The rollout phases (Waiting, Progressing, Finalising) and the
//! deletion branch are part of the graph so that a Grid carrying them is still
//! valid, but nothing moves a Grid into them yet.

use crds::GridPhase;

/// Something the reconciler observed that may move a Grid to another phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The Grid is reconciled for the first time
    FirstSeen,
    /// `metadata.generation` moved past `status.observedGeneration`
    SpecChanged,
    /// The primary workload exists and belongs to the Grid
    PrimaryReady,
    /// Target lookup, selector resolution or primary creation failed
    JobFailed,
}

/// Phase the Grid must move to, or `None` when it stays where it is.
///
/// Level-triggered: feeding the same trigger twice never yields a second
/// transition, so re-reconciling an unchanged Grid writes nothing.
pub fn next_phase(current: Option<GridPhase>, trigger: Trigger) -> Option<GridPhase> {
    match (current, trigger) {
        (None, Trigger::FirstSeen) => Some(GridPhase::Initializing),
        (Some(GridPhase::Failed | GridPhase::Succeeded), Trigger::SpecChanged) => {
            Some(GridPhase::Initializing)
        }
        (Some(GridPhase::Initializing), Trigger::PrimaryReady) => Some(GridPhase::Initialized),
        (Some(phase), Trigger::JobFailed) if !phase.is_terminal() => Some(GridPhase::Failed),
        _ => None,
    }
}

/// Whether `from -> to` is an edge of the Grid lifecycle graph.
///
/// Staying in the same phase is always allowed.
pub fn can_transition(from: Option<GridPhase>, to: GridPhase) -> bool {
    use GridPhase::*;

    let Some(from) = from else {
        return to == Initializing;
    };
    if from == to {
        return true;
    }
    match (from, to) {
        (Initializing, Initialized)
        | (Initialized, Waiting)
        | (Waiting, Progressing)
        | (Progressing, Finalising)
        | (Finalising, Succeeded)
        | (Terminating, Terminated)
        | (Failed | Succeeded, Initializing) => true,
        (from, Failed | Terminating) => !from.is_terminal(),
        _ => false,
    }
}

/// Phases in which the job manager must ensure the primary workload.
pub fn requires_job(phase: Option<GridPhase>) -> bool {
    matches!(phase, Some(GridPhase::Initializing | GridPhase::Initialized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use GridPhase::*;

    #[test]
    fn test_first_seen_enters_initializing() {
        assert_eq!(next_phase(None, Trigger::FirstSeen), Some(Initializing));
        for phase in GridPhase::ALL {
            assert_eq!(next_phase(Some(phase), Trigger::FirstSeen), None, "{phase}");
        }
    }

    #[test]
    fn test_primary_ready_only_completes_initialization() {
        assert_eq!(next_phase(Some(Initializing), Trigger::PrimaryReady), Some(Initialized));
        assert_eq!(next_phase(Some(Initialized), Trigger::PrimaryReady), None);
        assert_eq!(next_phase(None, Trigger::PrimaryReady), None);
        assert_eq!(next_phase(Some(Failed), Trigger::PrimaryReady), None);
    }

    #[test]
    fn test_job_failure_fails_non_terminal_phases() {
        for phase in [Initializing, Initialized, Waiting, Progressing, Finalising, Terminating] {
            assert_eq!(next_phase(Some(phase), Trigger::JobFailed), Some(Failed), "{phase}");
        }
        for phase in [Succeeded, Failed, Terminated] {
            assert_eq!(next_phase(Some(phase), Trigger::JobFailed), None, "{phase}");
        }
    }

    #[test]
    fn test_spec_change_resets_absorbing_phases() {
        assert_eq!(next_phase(Some(Failed), Trigger::SpecChanged), Some(Initializing));
        assert_eq!(next_phase(Some(Succeeded), Trigger::SpecChanged), Some(Initializing));
        assert_eq!(next_phase(Some(Terminated), Trigger::SpecChanged), None);
        assert_eq!(next_phase(Some(Initialized), Trigger::SpecChanged), None);
    }

    #[test]
    fn test_every_decision_is_a_graph_edge() {
        let triggers = [Trigger::FirstSeen, Trigger::SpecChanged, Trigger::PrimaryReady, Trigger::JobFailed];
        let currents = std::iter::once(None).chain(GridPhase::ALL.into_iter().map(Some));
        for current in currents {
            for trigger in triggers {
                if let Some(next) = next_phase(current, trigger) {
                    assert!(can_transition(current, next), "{current:?} -> {next} via {trigger:?}");
                }
            }
        }
    }

    #[test]
    fn test_graph_edges() {
        assert!(can_transition(None, Initializing));
        assert!(!can_transition(None, Initialized));
        assert!(can_transition(Some(Initializing), Initialized));
        assert!(can_transition(Some(Initialized), Waiting));
        assert!(can_transition(Some(Waiting), Progressing));
        assert!(can_transition(Some(Progressing), Finalising));
        assert!(can_transition(Some(Finalising), Succeeded));
        assert!(can_transition(Some(Progressing), Terminating));
        assert!(can_transition(Some(Terminating), Terminated));
        assert!(can_transition(Some(Terminating), Failed));
        assert!(can_transition(Some(Initialized), Initialized));

        assert!(!can_transition(Some(Initializing), Progressing));
        assert!(!can_transition(Some(Succeeded), Failed));
        assert!(!can_transition(Some(Failed), Terminating));
        assert!(!can_transition(Some(Terminated), Initializing));
        assert!(!can_transition(Some(Initialized), Succeeded));
    }

    #[test]
    fn test_requires_job() {
        assert!(requires_job(Some(Initializing)));
        assert!(requires_job(Some(Initialized)));
        assert!(!requires_job(None));
        assert!(!requires_job(Some(Failed)));
        assert!(!requires_job(Some(Progressing)));
    }
}
