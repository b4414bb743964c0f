//! GridClient trait for mocking
//!
//! This trait abstracts the Kubernetes API calls the Grid controller makes so
//! the reconciler can be unit tested without a cluster. The concrete
//! `KubeGridClient` implements it on top of `kube::Api`.

use crate::error::GridClientError;
use crds::Grid;
use k8s_openapi::api::apps::v1::Deployment;

/// Kubernetes operations needed to reconcile a Grid
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait GridClientTrait: Send + Sync {
    /// Fetch the authoritative copy of a Grid.
    async fn get_grid(&self, namespace: &str, name: &str) -> Result<Grid, GridClientError>;

    /// Write `grid.status` to the status subresource.
    ///
    /// The write carries `grid.metadata.resourceVersion` as a precondition, so a
    /// stale copy fails with `GridClientError::Conflict`. Returns the stored object.
    async fn update_grid_status(&self, grid: &Grid) -> Result<Grid, GridClientError>;

    /// Fetch a Deployment.
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, GridClientError>;

    /// Create a Deployment. Fails with `GridClientError::AlreadyExists` if the name is taken.
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, GridClientError>;
}
