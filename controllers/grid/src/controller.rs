//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! clients into a reconcile `Context` and runs the Grid watcher.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Context;
use crate::watcher::Watcher;
use grid_client::{KubeEventPublisher, KubeGridClient};
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for Grid rollouts.
pub struct Controller {
    grid_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts watching.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Grid Controller");

        let kube_client = Client::try_default().await?;

        let events = KubeEventPublisher::new(
            kube_client.clone(),
            &config.controller_name,
            config.node_name.clone(),
        );
        let context = Arc::new(Context::new(
            Arc::new(KubeGridClient::new(kube_client.clone())),
            Arc::new(events),
            config,
        ));

        let watcher = Watcher::new(kube_client, context);
        let grid_watcher = tokio::spawn(async move { watcher.watch_grids().await });

        Ok(Self { grid_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Grid Controller running");

        self.grid_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Grid watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("Grid watcher error: {}", e)))?;

        info!("Grid Controller shut down");
        Ok(())
    }
}
