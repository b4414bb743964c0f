//! Grid Controller
//!
//! Progressive delivery for Deployments. Reconciles `Grid` resources
//! (`paddy.io/v1`): each Grid names a target Deployment, and the controller
//! maintains a controller-owned `<target>-primary` copy of it while tracking
//! the rollout's phase in the Grid's status.

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Grid Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Controller name: {}", config.controller_name);
    info!("  Instance: {}", config.node_name.as_deref().unwrap_or("<unset>"));
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!("  Concurrency: {}", config.concurrency);
    info!("  Backoff: {:?} .. {:?}", config.backoff_min, config.backoff_max);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
