//! Paddy CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Grid rollout controller.

pub mod condition;
pub mod grid;
pub mod references;

pub use condition::*;
pub use grid::*;
pub use references::*;
