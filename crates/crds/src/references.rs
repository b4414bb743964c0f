//! Object references used by the Grid CRD
//!
//! `TargetObject` points at the user's workload, `AutoScaler` at the scaler
//! that should follow it. Both are plain name/kind/apiVersion triples in the
//! style of `TypedLocalObjectReference`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a workload in the Grid's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TargetObject {
    /// Name of the referent
    pub name: String,

    /// Kind of the referent (e.g., "Deployment")
    pub kind: String,

    /// API version of the referent (e.g., "apps/v1")
    pub api_version: String,
}

impl TargetObject {
    /// Reference to an `apps/v1` Deployment.
    pub fn deployment(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "Deployment".to_string(),
            api_version: "apps/v1".to_string(),
        }
    }
}

/// Reference to an autoscaler for the target.
///
/// Declared for the rollout model; the controller does not act on it yet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaler {
    /// Name of the scaler, defaults to the target's name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Kind of the scaler
    pub kind: String,

    /// API version of the scaler
    pub api_version: String,
}
