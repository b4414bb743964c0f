//! Test utilities for unit testing the reconciler
//!
//! Builders for Grids and Deployments plus a `Context` wired to the in-memory
//! client and event recorder from `grid-client`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ControllerConfig;
use crate::reconciler::{Context, GridKey};
use crds::{Grid, GridPhase, GridService, GridSpec, GridStatus, TargetObject};
use grid_client::{MockGridClient, RecordingEventPublisher};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Helper to create a target Deployment whose selector and pod labels are `match_labels`
pub fn create_test_deployment(name: &str, namespace: &str, match_labels: &[(&str, &str)]) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels(&[("team", "payments")])),
            annotations: Some(labels(&[("owner", "payments@example.com")])),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(2),
            min_ready_seconds: Some(10),
            revision_history_limit: Some(5),
            progress_deadline_seconds: Some(600),
            selector: LabelSelector {
                match_labels: Some(labels(match_labels)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(match_labels)),
                    annotations: Some(labels(&[("prometheus.io/scrape", "true")])),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "app".to_string(),
                        image: Some(format!("registry.example.com/{}:1.0.0", name)),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a Grid rolling out the Deployment `target`
pub fn create_test_grid(name: &str, namespace: &str, target: &str) -> Grid {
    let mut grid = Grid::new(
        name,
        GridSpec {
            work_instance: "paddy-0".to_string(),
            namespace: namespace.to_string(),
            service: GridService {
                port: 80,
                port_name: "http".to_string(),
                target_port: "8080".to_string(),
                ..Default::default()
            },
            target_ref: TargetObject::deployment(target),
            auto_scaler: None,
        },
    );
    grid.metadata.namespace = Some(namespace.to_string());
    grid
}

/// Helper to create a Grid already sitting in `phase`
pub fn create_test_grid_in_phase(name: &str, namespace: &str, target: &str, phase: GridPhase) -> Grid {
    let mut grid = create_test_grid(name, namespace, target);
    grid.status = Some(GridStatus {
        phase: Some(phase),
        observed_generation: Some(1),
        ..Default::default()
    });
    grid
}

/// Test harness: a Context plus handles on its fakes
pub struct TestHarness {
    pub client: MockGridClient,
    pub events: RecordingEventPublisher,
    pub context: Context,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let client = MockGridClient::new();
        let events = RecordingEventPublisher::new();
        let context = Context::new(Arc::new(client.clone()), Arc::new(events.clone()), config);
        Self { client, events, context }
    }

    /// Stored copy of a Grid, panicking if it is gone
    pub fn grid(&self, key: &GridKey) -> Grid {
        self.client
            .grid(&key.namespace, &key.name)
            .unwrap_or_else(|| panic!("grid {} should exist", key))
    }
}
