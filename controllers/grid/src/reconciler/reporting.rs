//! Phase change Events.

use crds::GridPhase;
use grid_client::events::reasons;
use kube::runtime::events::EventType;

/// Severity of a phase Event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Expected lifecycle progress
    Normal,
    /// Something needs the user's attention
    Warning,
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        }
    }
}

/// The Event published when a Grid enters a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseEvent {
    /// Normal or Warning
    pub type_: EventKind,
    /// CamelCase reason
    pub reason: &'static str,
    /// Human-readable message
    pub message: &'static str,
}

/// Event for entering `phase`. `Finalising` and `Terminated` publish nothing.
pub fn phase_event(phase: GridPhase) -> Option<PhaseEvent> {
    let (type_, reason, message) = match phase {
        GridPhase::Initializing => (EventKind::Normal, reasons::INITIALIZING, "Grid is initializing"),
        GridPhase::Initialized => (EventKind::Normal, reasons::INITIALIZED, "Grid is initialized"),
        GridPhase::Waiting => (
            EventKind::Normal,
            reasons::UPDATED,
            "Grid is waiting for progress, target has changed",
        ),
        GridPhase::Progressing => (EventKind::Normal, reasons::SCHEDULED, "Grid is progressing"),
        GridPhase::Succeeded => (EventKind::Normal, reasons::SUCCEEDED, "Grid is succeeded"),
        GridPhase::Failed => (EventKind::Warning, reasons::FAILED, "Grid is failed"),
        GridPhase::Terminating => (EventKind::Warning, reasons::TERMINATING, "Grid is terminating"),
        GridPhase::Finalising | GridPhase::Terminated => return None,
    };
    Some(PhaseEvent { type_, reason, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_table() {
        let table = [
            (GridPhase::Initializing, EventKind::Normal, "Initializing", "Grid is initializing"),
            (GridPhase::Initialized, EventKind::Normal, "Initialized", "Grid is initialized"),
            (GridPhase::Waiting, EventKind::Normal, "Updated", "Grid is waiting for progress, target has changed"),
            (GridPhase::Progressing, EventKind::Normal, "Scheduled", "Grid is progressing"),
            (GridPhase::Succeeded, EventKind::Normal, "Succeeded", "Grid is succeeded"),
            (GridPhase::Failed, EventKind::Warning, "Failed", "Grid is failed"),
            (GridPhase::Terminating, EventKind::Warning, "Terminating", "Grid is terminating"),
        ];
        for (phase, type_, reason, message) in table {
            assert_eq!(phase_event(phase), Some(PhaseEvent { type_, reason, message }), "{phase}");
        }
    }

    #[test]
    fn test_silent_phases() {
        assert_eq!(phase_event(GridPhase::Finalising), None);
        assert_eq!(phase_event(GridPhase::Terminated), None);
    }
}
