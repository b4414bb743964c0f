//! Grid client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum GridClientError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because the object's resourceVersion is stale
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Create rejected because an object with that name exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Kubernetes API returned another error status
    #[error("Kubernetes API error: {0}")]
    Api(String),

    /// Transport or client error from kube
    #[error("Kubernetes client error: {0}")]
    Kube(#[source] kube::Error),

    /// JSON serialization error while building a request
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object is missing a field the request needs (name, namespace, status)
    #[error("Invalid object: {0}")]
    InvalidObject(String),
}

impl GridClientError {
    /// Map a kube error onto the taxonomy the controller acts on.
    ///
    /// `what` names the object the request was about, e.g. `Deployment shop/checkout`.
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound(what.to_string()),
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Self::AlreadyExists(what.to_string())
            }
            kube::Error::Api(ae) if ae.code == 409 => {
                Self::Conflict(format!("{}: {}", what, ae.message))
            }
            kube::Error::Api(ae) => Self::Api(format!("{} ({}): {}", what, ae.code, ae.message)),
            other => Self::Kube(other),
        }
    }

    /// True for "object is gone" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for stale-resourceVersion write rejections.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
