//! Controller configuration.
//!
//! Everything is read from environment variables so the controller can be
//! configured from its Deployment manifest.

use crate::error::ControllerError;
use std::time::Duration;

/// Default reporting controller name on Events
pub const DEFAULT_CONTROLLER_NAME: &str = "grid-controller";

/// Runtime settings for the Grid Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, `None` for all namespaces
    pub namespace: Option<String>,
    /// Node the controller runs on, reported as the Event instance
    pub node_name: Option<String>,
    /// Reporting controller name on Events
    pub controller_name: String,
    /// Deadline for a single reconcile pass
    pub reconcile_timeout: Duration,
    /// Grids reconciled concurrently
    pub concurrency: u16,
    /// First retry delay after a failed reconcile
    pub backoff_min: Duration,
    /// Upper bound on the retry delay
    pub backoff_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            node_name: None,
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            reconcile_timeout: Duration::from_secs(30),
            concurrency: 4,
            backoff_min: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            node_name: non_empty("NODE_NAME"),
            controller_name: non_empty("CONTROLLER_NAME").unwrap_or(defaults.controller_name),
            reconcile_timeout: parse_secs(&lookup, "RECONCILE_TIMEOUT_SECS")?
                .unwrap_or(defaults.reconcile_timeout),
            concurrency: parse_var(&lookup, "WORKER_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            backoff_min: parse_secs(&lookup, "BACKOFF_MIN_SECS")?.unwrap_or(defaults.backoff_min),
            backoff_max: parse_secs(&lookup, "BACKOFF_MAX_SECS")?.unwrap_or(defaults.backoff_max),
        };

        if config.reconcile_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if config.concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "WORKER_CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if config.backoff_min.is_zero() || config.backoff_min > config.backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MIN_SECS ({}) must be positive and not exceed BACKOFF_MAX_SECS ({})",
                config.backoff_min.as_secs(),
                config.backoff_max.as_secs()
            )));
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            ControllerError::InvalidConfig(format!("{} has invalid value {:?}: {}", name, raw, e))
        }),
    }
}

fn parse_secs<F>(lookup: &F, name: &str) -> Result<Option<Duration>, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_var::<F, u64>(lookup, name)?.map(Duration::from_secs))
}
