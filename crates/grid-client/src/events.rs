//! Kubernetes Events for Grid rollouts
//!
//! Every phase a Grid enters is announced as an Event on the Grid, so
//! `kubectl describe grid <name>` shows the rollout history. The reason
//! strings below are the vocabulary of that history.
//!
//! Publishing never fails the caller: a rejected Event is logged and dropped.

use async_trait::async_trait;
use crds::Grid;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

/// Action recorded on every Event the controller publishes.
pub const ACTION_RECONCILE: &str = "Reconcile";

/// Reasons shown in the REASON column of `kubectl get events`, one per phase.
pub mod reasons {
    /// First reconcile started
    pub const INITIALIZING: &str = "Initializing";
    /// Primary workload is in place
    pub const INITIALIZED: &str = "Initialized";
    /// Target changed, rollout pending
    pub const UPDATED: &str = "Updated";
    /// Rollout scheduled
    pub const SCHEDULED: &str = "Scheduled";
    /// Rollout completed
    pub const SUCCEEDED: &str = "Succeeded";
    /// Rollout failed
    pub const FAILED: &str = "Failed";
    /// Grid is being torn down
    pub const TERMINATING: &str = "Terminating";
}

/// Sink for Events about cluster objects.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one Event on `object`. `note` is the human-readable message.
    async fn publish(
        &self,
        object: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );

    /// Publish a reconcile Event on a Grid.
    async fn publish_for_grid(&self, grid: &Grid, type_: EventType, reason: &str, note: &str) {
        self.publish(
            &grid.object_ref(&()),
            type_,
            reason,
            ACTION_RECONCILE,
            Some(note.to_string()),
        )
        .await;
    }
}

/// Publisher backed by the events.k8s.io API.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Report as `controller_name`, with `instance` (usually the node name) as the reporting instance.
    pub fn new(client: Client, controller_name: &str, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        object: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, object).await {
            warn!(
                grid = ?object.name,
                namespace = ?object.namespace,
                reason,
                error = %e,
                "Dropping Grid event"
            );
        }
    }
}
