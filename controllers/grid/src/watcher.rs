//! Kubernetes resource watchers.
//!
//! Drives Grid reconciliation with `kube_runtime::Controller`. The runtime
//! queues Grids by key, runs at most one reconcile per Grid at a time, and
//! re-queues a Grid whenever a Deployment it owns changes.

use crate::error::ControllerError;
use crate::reconciler::{Context, GridKey, ReconcileOutcome, reconcile_grid};
use crds::Grid;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use kube_runtime::controller::{self, Action, Config as RuntimeConfig};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Watches Grids and the Deployments they own.
pub struct Watcher {
    context: Arc<Context>,
    grid_api: Api<Grid>,
    deployment_api: Api<Deployment>,
}

impl Watcher {
    /// Creates a watcher scoped to the configured namespace, or the whole cluster.
    pub fn new(client: Client, context: Arc<Context>) -> Self {
        let (grid_api, deployment_api) = match context.config.namespace.as_deref() {
            Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
            None => (Api::all(client.clone()), Api::all(client)),
        };
        Self {
            context,
            grid_api,
            deployment_api,
        }
    }

    /// Runs the Grid controller loop until shutdown is signalled.
    pub async fn watch_grids(&self) -> Result<(), ControllerError> {
        info!(
            concurrency = self.context.config.concurrency,
            "Starting Grid watcher"
        );

        let runtime_config = RuntimeConfig::default().concurrency(self.context.config.concurrency);

        Controller::new(self.grid_api.clone(), watcher::Config::default())
            .owns(self.deployment_api.clone(), watcher::Config::default())
            .with_config(runtime_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.context.clone())
            .for_each(|res| {
                let ctx = self.context.clone();
                async move {
                    match res {
                        Ok((obj, _action)) => debug!("Reconciled Grid {}", obj),
                        Err(controller::Error::ObjectNotFound(obj)) => {
                            debug!("Grid {} deleted before reconcile", obj);
                            forget_deleted(&ctx, obj.namespace.as_deref(), &obj.name);
                        }
                        Err(e) => warn!("Grid controller error: {}", e),
                    }
                }
            })
            .await;

        info!("Grid watcher stopped");
        Ok(())
    }
}

async fn reconcile(grid: Arc<Grid>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = GridKey::of(&grid);
    let outcome = reconcile_grid(&ctx, &key).await?;

    match outcome {
        ReconcileOutcome::Deleted => ctx.reset_backoff(&key),
        ReconcileOutcome::Reconciled { phase } => {
            let failures = ctx.error_count(&key);
            if failures > 0 {
                info!(grid = %key, failures, "Grid reconciled after earlier failures");
                ctx.reset_backoff(&key);
            }
            debug!(grid = %key, phase = ?phase, "Reconcile pass complete");
        }
    }
    Ok(Action::await_change())
}

/// Drop the retry state of a Grid that no longer exists.
fn forget_deleted(ctx: &Context, namespace: Option<&str>, name: &str) {
    let key = GridKey::new(namespace.unwrap_or("default"), name);
    if ctx.error_count(&key) > 0 {
        debug!(grid = %key, "Clearing backoff of deleted Grid");
    }
    ctx.reset_backoff(&key);
}

fn error_policy(grid: Arc<Grid>, err: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = GridKey::of(&grid);
    let (delay, failures) = ctx.record_failure(&key);
    error!(
        grid = %key,
        failures,
        retry_in = ?delay,
        "Reconciliation failed: {}",
        err
    );
    Action::requeue(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestHarness, create_test_grid};

    #[test]
    fn test_forget_deleted_clears_backoff() {
        let harness = TestHarness::new();
        let key = GridKey::new("shop", "checkout");
        harness.context.record_failure(&key);
        harness.context.record_failure(&key);
        assert_eq!(harness.context.error_count(&key), 2);

        forget_deleted(&harness.context, Some("shop"), "checkout");

        assert_eq!(harness.context.error_count(&key), 0);
    }

    #[test]
    fn test_forget_deleted_leaves_other_grids() {
        let harness = TestHarness::new();
        let deleted = GridKey::new("shop", "checkout");
        let live = GridKey::new("shop", "cart");
        harness.context.record_failure(&deleted);
        harness.context.record_failure(&live);

        forget_deleted(&harness.context, Some("shop"), "checkout");

        assert_eq!(harness.context.error_count(&deleted), 0);
        assert_eq!(harness.context.error_count(&live), 1);
    }

    #[tokio::test]
    async fn test_reconcile_of_deleted_grid_clears_backoff() {
        let harness = TestHarness::new();
        let ctx = Arc::new(harness.context);
        let grid = create_test_grid("checkout", "shop", "checkout");
        let key = GridKey::of(&grid);
        ctx.record_failure(&key);

        // The Grid was never added to the client, so the fresh read finds nothing.
        let action = reconcile(Arc::new(grid), ctx.clone()).await.expect("deleted Grid is not an error");

        assert_eq!(action, Action::await_change());
        assert_eq!(ctx.error_count(&key), 0);
    }
}
