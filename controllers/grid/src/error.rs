//! Controller-specific error types.
//!
//! This module defines the errors a Grid reconcile can return. Everything
//! except a missing Grid is handed back to the controller runtime, which
//! requeues the Grid with backoff.

use grid_client::GridClientError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Grid Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error from the Grid client
    #[error("Kubernetes API error: {0}")]
    Client(#[from] GridClientError),

    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Target Deployment referenced by the Grid does not exist
    #[error("Target workload not found: {0}")]
    TargetNotFound(String),

    /// Target Deployment's selector has none of the supported label keys
    #[error("Selector label error: {0}")]
    SelectorLabel(String),

    /// Primary Deployment could not be created
    #[error("Primary workload creation failed: {0}")]
    PrimaryCreate(String),

    /// A Deployment with the primary's name exists but belongs to something else
    #[error("Primary workload conflict: {0}")]
    PrimaryConflict(String),

    /// Phase change outside the Grid lifecycle graph
    #[error("Invalid phase transition: {0}")]
    InvalidTransition(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconcile did not finish before its deadline
    #[error("Reconcile timed out: {0}")]
    Timeout(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
