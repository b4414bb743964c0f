//! In-memory fakes for unit testing
//!
//! `MockGridClient` keeps Grids and Deployments in maps and enforces the same
//! resourceVersion preconditions the API server does, so tests exercise the
//! reconciler's write-then-reload discipline. `RecordingEventPublisher`
//! captures published Events.

use crate::error::GridClientError;
use crate::events::EventPublisher;
use crate::grid_trait::GridClientTrait;
use crds::{Grid, GridSpec};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type ObjectKey = (String, String);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Mock GridClient for testing
#[derive(Clone, Default)]
pub struct MockGridClient {
    grids: Arc<Mutex<HashMap<ObjectKey, Grid>>>,
    deployments: Arc<Mutex<HashMap<ObjectKey, Deployment>>>,
    next_version: Arc<Mutex<u64>>,
    create_failure: Arc<Mutex<Option<String>>>,
    latency: Arc<Mutex<Option<Duration>>>,
    create_calls: Arc<Mutex<usize>>,
    status_updates: Arc<Mutex<usize>>,
}

impl MockGridClient {
    /// Create an empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        let mut version = lock(&self.next_version);
        *version += 1;
        version.to_string()
    }

    /// Store a Grid, assigning uid, generation and resourceVersion like the API server
    pub fn add_grid(&self, mut grid: Grid) {
        let namespace = grid.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = grid.metadata.name.clone().unwrap_or_default();
        grid.metadata.namespace = Some(namespace.clone());
        grid.metadata.uid.get_or_insert_with(|| format!("uid-grid-{}", name));
        grid.metadata.generation.get_or_insert(1);
        grid.metadata.resource_version = Some(self.bump_version());
        lock(&self.grids).insert(key(&namespace, &name), grid);
    }

    /// Store a Deployment (test setup)
    pub fn add_deployment(&self, mut deployment: Deployment) {
        let namespace = deployment.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = deployment.metadata.name.clone().unwrap_or_default();
        deployment.metadata.namespace = Some(namespace.clone());
        deployment.metadata.resource_version = Some(self.bump_version());
        lock(&self.deployments).insert(key(&namespace, &name), deployment);
    }

    /// Current stored copy of a Grid
    pub fn grid(&self, namespace: &str, name: &str) -> Option<Grid> {
        lock(&self.grids).get(&key(namespace, name)).cloned()
    }

    /// Current stored copy of a Deployment
    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        lock(&self.deployments).get(&key(namespace, name)).cloned()
    }

    /// Delete a Grid
    pub fn remove_grid(&self, namespace: &str, name: &str) {
        lock(&self.grids).remove(&key(namespace, name));
    }

    /// Simulate a user edit: mutate the spec and bump generation and resourceVersion
    pub fn update_grid_spec(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut GridSpec)) {
        let version = self.bump_version();
        if let Some(grid) = lock(&self.grids).get_mut(&key(namespace, name)) {
            edit(&mut grid.spec);
            grid.metadata.generation = Some(grid.metadata.generation.unwrap_or(0) + 1);
            grid.metadata.resource_version = Some(version);
        }
    }

    /// Simulate a concurrent writer: bump the stored resourceVersion only
    pub fn touch_grid(&self, namespace: &str, name: &str) {
        let version = self.bump_version();
        if let Some(grid) = lock(&self.grids).get_mut(&key(namespace, name)) {
            grid.metadata.resource_version = Some(version);
        }
    }

    /// Make every subsequent Deployment create fail with an API error
    pub fn fail_deployment_creates(&self, message: impl Into<String>) {
        *lock(&self.create_failure) = Some(message.into());
    }

    /// Delay every call, to exercise deadlines
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Number of create_deployment calls made
    pub fn create_calls(&self) -> usize {
        *lock(&self.create_calls)
    }

    /// Number of successful status writes
    pub fn status_updates(&self) -> usize {
        *lock(&self.status_updates)
    }

    async fn delay(&self) {
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl GridClientTrait for MockGridClient {
    async fn get_grid(&self, namespace: &str, name: &str) -> Result<Grid, GridClientError> {
        self.delay().await;
        self.grid(namespace, name)
            .ok_or_else(|| GridClientError::NotFound(format!("Grid {}/{}", namespace, name)))
    }

    async fn update_grid_status(&self, grid: &Grid) -> Result<Grid, GridClientError> {
        self.delay().await;
        let name = grid.metadata.name.clone()
            .ok_or_else(|| GridClientError::InvalidObject("Grid missing name".to_string()))?;
        let namespace = grid.metadata.namespace.clone()
            .ok_or_else(|| GridClientError::InvalidObject(format!("Grid {} missing namespace", name)))?;
        if grid.status.is_none() {
            return Err(GridClientError::InvalidObject(format!(
                "Grid {}/{} has no status to write",
                namespace, name
            )));
        }

        let version = self.bump_version();
        let mut grids = lock(&self.grids);
        let stored = grids
            .get_mut(&key(&namespace, &name))
            .ok_or_else(|| GridClientError::NotFound(format!("Grid {}/{}", namespace, name)))?;
        if stored.metadata.resource_version != grid.metadata.resource_version {
            return Err(GridClientError::Conflict(format!(
                "Grid {}/{}: the object has been modified; please apply your changes to the latest version and try again",
                namespace, name
            )));
        }
        stored.status = grid.status.clone();
        stored.metadata.resource_version = Some(version);
        *lock(&self.status_updates) += 1;
        Ok(stored.clone())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, GridClientError> {
        self.delay().await;
        self.deployment(namespace, name)
            .ok_or_else(|| GridClientError::NotFound(format!("Deployment {}/{}", namespace, name)))
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, GridClientError> {
        self.delay().await;
        *lock(&self.create_calls) += 1;
        if let Some(message) = lock(&self.create_failure).clone() {
            return Err(GridClientError::Api(message));
        }

        let name = deployment.metadata.name.clone()
            .ok_or_else(|| GridClientError::InvalidObject("Deployment missing name".to_string()))?;
        let version = self.bump_version();
        let mut deployments = lock(&self.deployments);
        if deployments.contains_key(&key(namespace, &name)) {
            return Err(GridClientError::AlreadyExists(format!("Deployment {}/{}", namespace, name)));
        }
        let mut created = deployment.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.uid = Some(format!("uid-deployment-{}", name));
        created.metadata.resource_version = Some(version);
        deployments.insert(key(namespace, &name), created.clone());
        Ok(created)
    }
}

/// An Event captured by `RecordingEventPublisher`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Name of the object the Event was attached to
    pub object: String,
    /// "Normal" or "Warning"
    pub type_: String,
    /// Event reason
    pub reason: String,
    /// Event action
    pub action: String,
    /// Event message
    pub note: Option<String>,
}

/// EventPublisher that keeps every Event in memory
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every Event published so far, oldest first
    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    /// Reasons of every Event published so far
    pub fn reasons(&self) -> Vec<String> {
        lock(&self.events).iter().map(|e| e.reason.clone()).collect()
    }
}

#[async_trait::async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        object: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        lock(&self.events).push(RecordedEvent {
            object: object.name.clone().unwrap_or_default(),
            type_: format!("{:?}", type_),
            reason: reason.to_string(),
            action: action.to_string(),
            note,
        });
    }
}
