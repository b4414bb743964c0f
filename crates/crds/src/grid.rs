//! Grid CRD
//!
//! Describes a progressive rollout of a target Deployment behind a stable
//! Service. The controller derives a `<target>-primary` Deployment from the
//! target and reports progress through `status.phase` and `status.conditions`.

use std::fmt;
use std::str::FromStr;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::condition::GridCondition;
use crate::references::{AutoScaler, TargetObject};

/// Suffix appended to the target's name to form the primary Deployment name.
pub const PRIMARY_SUFFIX: &str = "-primary";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "paddy.io",
    version = "v1",
    kind = "Grid",
    namespaced,
    status = "GridStatus",
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.targetRef.name"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    /// Which controller instance works this rollout
    #[serde(default)]
    pub work_instance: String,

    /// Namespace of the managed deployment, service and scalers
    #[serde(default)]
    pub namespace: String,

    /// Stable service in front of the rollout
    #[serde(default)]
    pub service: GridService,

    /// Workload being rolled out
    pub target_ref: TargetObject,

    /// Scaler attached to the target (declared, not yet acted on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaler: Option<AutoScaler>,
}

/// Service definition for a Grid.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GridService {
    /// Name of the generated service, defaults to the target's name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Service port
    pub port: i32,

    /// Name of the service port
    #[serde(default)]
    pub port_name: String,

    /// Container port or port name traffic is sent to
    #[serde(default)]
    pub target_port: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridStatus {
    /// Conditions keyed by type, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<GridCondition>,

    /// Current lifecycle phase; absent until the first reconcile
    #[serde(
        default,
        deserialize_with = "deserialize_phase",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<GridPhase>")]
    pub phase: Option<GridPhase>,

    /// Spec generation the phase was last derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Lifecycle phase of a Grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum GridPhase {
    /// First reconcile has started
    Initializing,
    /// Primary workload exists
    Initialized,
    /// Target changed, rollout not yet started
    Waiting,
    /// Rollout in progress
    Progressing,
    /// Rollout is promoting the new version
    Finalising,
    /// Rollout completed
    Succeeded,
    /// Rollout failed
    Failed,
    /// Grid is being deleted
    Terminating,
    /// Grid cleanup completed
    Terminated,
}

impl GridPhase {
    /// Every phase, in lifecycle order.
    pub const ALL: [GridPhase; 9] = [
        GridPhase::Initializing,
        GridPhase::Initialized,
        GridPhase::Waiting,
        GridPhase::Progressing,
        GridPhase::Finalising,
        GridPhase::Succeeded,
        GridPhase::Failed,
        GridPhase::Terminating,
        GridPhase::Terminated,
    ];

    /// Wire representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            GridPhase::Initializing => "Initializing",
            GridPhase::Initialized => "Initialized",
            GridPhase::Waiting => "Waiting",
            GridPhase::Progressing => "Progressing",
            GridPhase::Finalising => "Finalising",
            GridPhase::Succeeded => "Succeeded",
            GridPhase::Failed => "Failed",
            GridPhase::Terminating => "Terminating",
            GridPhase::Terminated => "Terminated",
        }
    }

    /// Absorbing phases. Only a spec change moves a Grid out of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GridPhase::Succeeded | GridPhase::Failed | GridPhase::Terminated
        )
    }
}

impl fmt::Display for GridPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown phase string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grid phase: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for GridPhase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GridPhase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// Objects written before the first reconcile carry `phase: ""`.
fn deserialize_phase<'de, D>(deserializer: D) -> Result<Option<GridPhase>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Grid {
    /// Name of the primary Deployment derived from the target.
    pub fn primary_name(&self) -> String {
        primary_name_for(&self.spec.target_ref.name)
    }

    /// Current phase, `None` before initialization.
    pub fn phase(&self) -> Option<GridPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }

    /// `namespace/name` for logs.
    pub fn log_name(&self) -> String {
        format!(
            "{}/{}",
            self.metadata.namespace.as_deref().unwrap_or("default"),
            self.metadata.name.as_deref().unwrap_or("<unknown>")
        )
    }
}

/// Primary Deployment name for a target name.
pub fn primary_name_for(target_name: &str) -> String {
    format!("{target_name}{PRIMARY_SUFFIX}")
}
