//! Grid reconciliation.
//!
//! One pass of `reconcile_grid` drives a Grid as far along its lifecycle as
//! the cluster allows:
//!
//! 1. Seed the `Available` condition on first sight.
//! 2. Enter `Initializing` (new Grid, or an absorbing phase after a spec edit).
//! 3. While initializing, ensure the primary Deployment via the job manager.
//!
//! Every status write carries the Grid's `resourceVersion` and is followed by
//! a fresh read, so each step works on the object the API server holds.

pub mod conditions;
pub mod job_manager;
pub mod phase;
pub mod reporting;
pub mod selector;


use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crds::{CONDITION_AVAILABLE, ConditionStatus, Grid, GridCondition, GridPhase};
use grid_client::{EventPublisher, GridClientTrait};
use kube::ResourceExt;
use tracing::{debug, info};

use crate::backoff::BackoffTable;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use conditions::{REASON_JOB_MANAGE, REASON_RECONCILING, find_condition, set_condition};
use job_manager::JobOutcome;
use phase::{Trigger, can_transition, next_phase, requires_job};
use reporting::phase_event;

/// Identity of a Grid in the work queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridKey {
    /// Namespace of the Grid, which is also where its workloads live
    pub namespace: String,
    /// Name of the Grid
    pub name: String,
}

impl GridKey {
    /// Key for `namespace/name`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object read from the cluster.
    pub fn of(grid: &Grid) -> Self {
        Self::new(
            grid.namespace().unwrap_or_else(|| "default".to_string()),
            grid.name_any(),
        )
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// What a reconcile pass ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Grid no longer exists; nothing was done
    Deleted,
    /// The Grid was reconciled and sits in `phase`
    Reconciled {
        /// Phase after the pass
        phase: Option<GridPhase>,
    },
}

/// Shared state handed to every reconcile.
pub struct Context {
    /// Kubernetes API access
    pub client: Arc<dyn GridClientTrait>,
    /// Event sink for phase changes
    pub events: Arc<dyn EventPublisher>,
    /// Runtime settings
    pub config: ControllerConfig,
    backoff: Mutex<BackoffTable>,
}

impl Context {
    /// Build a context with an empty backoff table.
    pub fn new(
        client: Arc<dyn GridClientTrait>,
        events: Arc<dyn EventPublisher>,
        config: ControllerConfig,
    ) -> Self {
        let backoff = BackoffTable::new(config.backoff_min, config.backoff_max);
        Self {
            client,
            events,
            config,
            backoff: Mutex::new(backoff),
        }
    }

    fn backoff(&self) -> MutexGuard<'_, BackoffTable> {
        self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failed pass for `key`; returns the retry delay and failure count.
    pub fn record_failure(&self, key: &GridKey) -> (Duration, u32) {
        self.backoff().record_failure(&key.to_string())
    }

    /// Forget earlier failures of `key`.
    pub fn reset_backoff(&self, key: &GridKey) {
        self.backoff().reset(&key.to_string());
    }

    /// Consecutive failed passes for `key`.
    pub fn error_count(&self, key: &GridKey) -> u32 {
        self.backoff().error_count(&key.to_string())
    }
}

/// Reconcile the Grid named by `key`, bounded by the configured deadline.
pub async fn reconcile_grid(ctx: &Context, key: &GridKey) -> Result<ReconcileOutcome, ControllerError> {
    let deadline = ctx.config.reconcile_timeout;
    match tokio::time::timeout(deadline, reconcile_once(ctx, key)).await {
        Ok(result) => result,
        Err(_) => Err(ControllerError::Timeout(format!(
            "Grid {} not reconciled within {:?}",
            key, deadline
        ))),
    }
}

async fn reconcile_once(ctx: &Context, key: &GridKey) -> Result<ReconcileOutcome, ControllerError> {
    let mut grid = match ctx.client.get_grid(&key.namespace, &key.name).await {
        Ok(grid) => grid,
        Err(e) if e.is_not_found() => {
            debug!(grid = %key, "Grid not found, skipping");
            return Ok(ReconcileOutcome::Deleted);
        }
        Err(e) => return Err(e.into()),
    };
    debug!(grid = %key, phase = ?grid.phase(), "Reconciling Grid");

    let has_available = grid
        .status
        .as_ref()
        .is_some_and(|s| find_condition(&s.conditions, CONDITION_AVAILABLE).is_some());
    if !has_available {
        let generation = grid.metadata.generation;
        let status = grid.status.get_or_insert_with(Default::default);
        set_condition(
            &mut status.conditions,
            GridCondition::new(
                CONDITION_AVAILABLE,
                ConditionStatus::Unknown,
                REASON_RECONCILING,
                "Starting reconciling",
            )
            .with_generation(generation),
        );
        grid = write_status(ctx, &grid).await?;
    }

    let trigger = if grid.phase().is_none() {
        Some(Trigger::FirstSeen)
    } else if spec_changed(&grid) {
        Some(Trigger::SpecChanged)
    } else {
        None
    };
    if let Some(next) = trigger.and_then(|t| next_phase(grid.phase(), t)) {
        grid = transition(ctx, grid, next, None).await?;
    }

    if requires_job(grid.phase()) {
        let outcome = job_manager::ensure_primary(ctx, &grid).await?;
        grid = primary_ready(ctx, grid, outcome).await?;
    }

    Ok(ReconcileOutcome::Reconciled { phase: grid.phase() })
}

fn spec_changed(grid: &Grid) -> bool {
    let observed = grid.status.as_ref().and_then(|s| s.observed_generation);
    grid.metadata.generation != observed
}

async fn primary_ready(ctx: &Context, mut grid: Grid, outcome: JobOutcome) -> Result<Grid, ControllerError> {
    let JobOutcome::PrimaryReady { created } = outcome;
    debug!(grid = %GridKey::of(&grid), created, "Primary workload ready");

    let ready = GridCondition::new(
        CONDITION_AVAILABLE,
        ConditionStatus::True,
        REASON_JOB_MANAGE,
        "Primary workload is ready",
    );
    if let Some(next) = next_phase(grid.phase(), Trigger::PrimaryReady) {
        return transition(ctx, grid, next, Some(ready)).await;
    }

    let generation = grid.metadata.generation;
    let status = grid.status.get_or_insert_with(Default::default);
    if set_condition(&mut status.conditions, ready.with_generation(generation)) {
        grid = write_status(ctx, &grid).await?;
    }
    Ok(grid)
}

/// Move `grid` to phase `to`, optionally merging `condition`, persist it and
/// publish the phase Event. Returns the re-read Grid.
pub(crate) async fn transition(
    ctx: &Context,
    mut grid: Grid,
    to: GridPhase,
    condition: Option<GridCondition>,
) -> Result<Grid, ControllerError> {
    let from = grid.phase();
    if !can_transition(from, to) {
        return Err(ControllerError::InvalidTransition(format!(
            "Grid {}: {} -> {}",
            GridKey::of(&grid),
            from.map_or("<empty>", |p| p.as_str()),
            to
        )));
    }

    let generation = grid.metadata.generation;
    let status = grid.status.get_or_insert_with(Default::default);
    status.phase = Some(to);
    status.observed_generation = generation;
    if let Some(condition) = condition {
        set_condition(&mut status.conditions, condition.with_generation(generation));
    }

    let grid = write_status(ctx, &grid).await?;
    if from != Some(to) {
        info!(grid = %GridKey::of(&grid), from = ?from, to = %to, "Grid phase changed");
        publish_phase_event(ctx, &grid, to).await;
    }
    Ok(grid)
}

/// Write the status subresource, then read the Grid back.
async fn write_status(ctx: &Context, grid: &Grid) -> Result<Grid, ControllerError> {
    let key = GridKey::of(grid);
    ctx.client.update_grid_status(grid).await?;
    Ok(ctx.client.get_grid(&key.namespace, &key.name).await?)
}

async fn publish_phase_event(ctx: &Context, grid: &Grid, phase: GridPhase) {
    let Some(event) = phase_event(phase) else {
        return;
    };
    ctx.events
        .publish_for_grid(grid, event.type_.into(), event.reason, event.message)
        .await;
}
