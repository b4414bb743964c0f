//! Kubernetes access for the Grid controller
//!
//! Typed access to `Grid` objects and the Deployments they manage, plus
//! Kubernetes Event publishing. Both sit behind traits so the reconciler can
//! run against in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use grid_client::{GridClientTrait, KubeGridClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeGridClient::try_default().await?;
//! let grid = client.get_grid("shop", "checkout").await?;
//! println!("primary: {}", grid.primary_name());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod events;
#[path = "trait.rs"]
pub mod grid_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeGridClient;
pub use error::GridClientError;
pub use events::{EventPublisher, KubeEventPublisher};
pub use grid_trait::GridClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockGridClient, RecordedEvent, RecordingEventPublisher};
