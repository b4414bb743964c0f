//! Kubernetes API client for Grid resources
//!
//! Implements `GridClientTrait` with `kube::Api`. Status writes go through the
//! status subresource as merge patches that carry the object's
//! `resourceVersion`, which makes the API server reject stale writes.

use crate::error::GridClientError;
use crate::grid_trait::GridClientTrait;
use crds::Grid;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde_json::{Value, json};
use tracing::debug;

/// Grid client backed by a live cluster connection
#[derive(Clone)]
pub struct KubeGridClient {
    client: Client,
}

impl KubeGridClient {
    /// Wrap an existing Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster config or the local kubeconfig
    pub async fn try_default() -> Result<Self, GridClientError> {
        let client = Client::try_default()
            .await
            .map_err(GridClientError::Kube)?;
        Ok(Self::new(client))
    }

    /// Underlying Kubernetes client
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    fn grids(&self, namespace: &str) -> Api<Grid> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Merge patch for the status subresource, pinned to the Grid's resourceVersion.
fn status_patch(grid: &Grid) -> Result<Value, GridClientError> {
    let status = grid.status.as_ref().ok_or_else(|| {
        GridClientError::InvalidObject(format!("Grid {} has no status to write", grid.log_name()))
    })?;
    Ok(json!({
        "apiVersion": Grid::api_version(&()),
        "kind": Grid::kind(&()),
        "metadata": {
            "resourceVersion": grid.metadata.resource_version,
        },
        "status": serde_json::to_value(status)?,
    }))
}

#[async_trait::async_trait]
impl GridClientTrait for KubeGridClient {
    async fn get_grid(&self, namespace: &str, name: &str) -> Result<Grid, GridClientError> {
        debug!("GET Grid {}/{}", namespace, name);
        self.grids(namespace)
            .get(name)
            .await
            .map_err(|e| GridClientError::from_kube(e, &format!("Grid {}/{}", namespace, name)))
    }

    async fn update_grid_status(&self, grid: &Grid) -> Result<Grid, GridClientError> {
        let name = grid.metadata.name.as_deref()
            .ok_or_else(|| GridClientError::InvalidObject("Grid missing name".to_string()))?;
        let namespace = grid.metadata.namespace.as_deref()
            .ok_or_else(|| GridClientError::InvalidObject(format!("Grid {} missing namespace", name)))?;
        let patch = status_patch(grid)?;

        debug!(
            "PATCH Grid {}/{} status (resourceVersion {:?})",
            namespace, name, grid.metadata.resource_version
        );
        self.grids(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| GridClientError::from_kube(e, &format!("Grid {}/{}", namespace, name)))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, GridClientError> {
        debug!("GET Deployment {}/{}", namespace, name);
        self.deployments(namespace)
            .get(name)
            .await
            .map_err(|e| GridClientError::from_kube(e, &format!("Deployment {}/{}", namespace, name)))
    }

    async fn create_deployment(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment, GridClientError> {
        let name = deployment.metadata.name.as_deref().unwrap_or("<unnamed>");
        debug!("POST Deployment {}/{}", namespace, name);
        self.deployments(namespace)
            .create(&PostParams::default(), deployment)
            .await
            .map_err(|e| GridClientError::from_kube(e, &format!("Deployment {}/{}", namespace, name)))
    }
}
