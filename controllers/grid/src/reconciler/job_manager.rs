//! Primary workload management.
//!
//! Ensures the `<target>-primary` Deployment exists for a Grid. The primary is
//! a copy of the user's target with a selector that cannot match the target's
//! pods, controller-owned by the Grid so it is garbage collected with it.
//!
//! Failures that need the user's attention (missing target, unusable
//! selector, name taken, rejected create) move the Grid to `Failed` before
//! the error is returned. Transient API errors are returned as-is and retried.

use std::collections::BTreeMap;

use crds::{CONDITION_AVAILABLE, ConditionStatus, Grid, GridCondition};
use grid_client::GridClientError;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use tracing::{debug, info, warn};

use super::conditions::REASON_JOB_MANAGE;
use super::phase::{Trigger, next_phase};
use super::selector::{SelectorLabel, resolve_selector_label};
use super::{Context, GridKey, transition};
use crate::error::ControllerError;

/// Condition message when the target Deployment is missing.
pub const TARGET_NOT_FOUND_MESSAGE: &str = "Can not find target resource";

/// Result of a successful `ensure_primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The primary exists and belongs to the Grid
    PrimaryReady {
        /// Whether this pass created it
        created: bool,
    },
}

/// Make sure the Grid's primary Deployment exists.
pub async fn ensure_primary(ctx: &Context, grid: &Grid) -> Result<JobOutcome, ControllerError> {
    let key = GridKey::of(grid);
    let target_name = grid.spec.target_ref.name.as_str();

    let target = match ctx.client.get_deployment(&key.namespace, target_name).await {
        Ok(target) => target,
        Err(e) if e.is_not_found() => {
            let err = ControllerError::TargetNotFound(format!("Deployment {}/{}", key.namespace, target_name));
            return Err(record_failure(ctx, grid, err).await);
        }
        Err(e) => return Err(e.into()),
    };

    let label = match resolve_selector_label(&target) {
        Ok(label) => label,
        Err(err) => return Err(record_failure(ctx, grid, err).await),
    };
    debug!(grid = %key, key = %label.key, value = %label.value, "Resolved selector label");

    let primary_name = grid.primary_name();
    match ctx.client.get_deployment(&key.namespace, &primary_name).await {
        Ok(existing) => return check_existing(ctx, grid, &existing).await,
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let primary = match build_primary(grid, &target, &label) {
        Ok(primary) => primary,
        Err(err) => return Err(record_failure(ctx, grid, err).await),
    };

    match ctx.client.create_deployment(&key.namespace, &primary).await {
        Ok(_) => {
            info!(grid = %key, primary = %primary_name, "Created primary Deployment");
            Ok(JobOutcome::PrimaryReady { created: true })
        }
        Err(GridClientError::AlreadyExists(_)) => {
            // Lost a race with another pass; judge whoever won.
            let existing = ctx.client.get_deployment(&key.namespace, &primary_name).await?;
            check_existing(ctx, grid, &existing).await
        }
        Err(e) => {
            let err = ControllerError::PrimaryCreate(format!("Deployment {}/{}: {}", key.namespace, primary_name, e));
            Err(record_failure(ctx, grid, err).await)
        }
    }
}

async fn check_existing(ctx: &Context, grid: &Grid, existing: &Deployment) -> Result<JobOutcome, ControllerError> {
    if is_controlled_by(existing, grid) {
        debug!(grid = %GridKey::of(grid), "Primary Deployment already exists");
        return Ok(JobOutcome::PrimaryReady { created: false });
    }
    let err = ControllerError::PrimaryConflict(format!(
        "deployment {}.{} exists and is not controlled by grid {}",
        existing.metadata.name.as_deref().unwrap_or_default(),
        existing.metadata.namespace.as_deref().unwrap_or_default(),
        grid.metadata.name.as_deref().unwrap_or_default(),
    ));
    Err(record_failure(ctx, grid, err).await)
}

/// Whether `deployment` has a controller owner reference to `grid`.
pub fn is_controlled_by(deployment: &Deployment, grid: &Grid) -> bool {
    let Some(uid) = grid.metadata.uid.as_deref() else {
        return false;
    };
    deployment
        .metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.controller == Some(true) && owner.uid == uid)
}

/// Build the primary Deployment for `grid` from its `target`.
///
/// Metadata labels and annotations, rollout settings and the pod template are
/// copied from the target. Only the name, owner and selector differ.
pub fn build_primary(grid: &Grid, target: &Deployment, label: &SelectorLabel) -> Result<Deployment, ControllerError> {
    let owner = grid.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::PrimaryCreate(format!("grid {} has no uid to own the primary", grid.log_name()))
    })?;
    let target_spec = target.spec.as_ref().ok_or_else(|| {
        ControllerError::PrimaryCreate(format!(
            "deployment {} has no spec",
            target.metadata.name.as_deref().unwrap_or_default()
        ))
    })?;
    let template_meta = target_spec.template.metadata.as_ref();

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(grid.primary_name()),
            namespace: grid.metadata.namespace.clone(),
            labels: target.metadata.labels.clone(),
            annotations: target.metadata.annotations.clone(),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            progress_deadline_seconds: target_spec.progress_deadline_seconds,
            min_ready_seconds: target_spec.min_ready_seconds,
            revision_history_limit: target_spec.revision_history_limit,
            replicas: target_spec.replicas,
            strategy: target_spec.strategy.clone(),
            selector: LabelSelector {
                match_labels: Some(BTreeMap::from([(label.key.clone(), label.primary_value())])),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: template_meta.and_then(|m| m.labels.clone()),
                    annotations: template_meta.and_then(|m| m.annotations.clone()),
                    ..Default::default()
                }),
                spec: target_spec.template.spec.clone(),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// Text for the `Available=False` condition describing `err`.
pub fn failure_message(err: &ControllerError) -> String {
    match err {
        ControllerError::TargetNotFound(_) => TARGET_NOT_FOUND_MESSAGE.to_string(),
        ControllerError::SelectorLabel(msg)
        | ControllerError::PrimaryCreate(msg)
        | ControllerError::PrimaryConflict(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Move the Grid to `Failed` with an `Available=False` condition, then hand
/// back `err` for the caller to return.
///
/// A failed status write is logged; the original error still drives the retry.
async fn record_failure(ctx: &Context, grid: &Grid, err: ControllerError) -> ControllerError {
    warn!(grid = %GridKey::of(grid), error = %err, "Primary workload job failed");

    let Some(failed) = next_phase(grid.phase(), Trigger::JobFailed) else {
        return err;
    };
    let condition = GridCondition::new(
        CONDITION_AVAILABLE,
        ConditionStatus::False,
        REASON_JOB_MANAGE,
        failure_message(&err),
    );
    if let Err(write_err) = transition(ctx, grid.clone(), failed, Some(condition)).await {
        warn!(grid = %GridKey::of(grid), error = %write_err, "Failed to record Failed phase");
    }
    err
}
