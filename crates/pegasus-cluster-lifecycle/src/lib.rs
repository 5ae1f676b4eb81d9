//! Node lifecycle orchestration for Pegasus clusters
//!
//! Adds, removes, and rolling-upgrades replica nodes while keeping every
//! partition available. The cluster is driven through its admin shell
//! ([`admin`]) and node processes through a [`deployment::Deployment`]
//! backend.
//!
//! Related crates:
//! - `pegasus-cluster-common`: errors, convergence polling, logging setup
//! - `pegasus-cluster-cli`: the `pegasus-cluster` binary

pub mod admin;
mod context;
pub mod deployment;
pub mod orchestrator;
pub mod phases;
pub mod rebalance;
pub mod registry;
pub mod removal;
pub mod settings;

#[cfg(test)]
mod testing;

pub use admin::{AdminClient, AdminCommandExecutor, ShellExecutor, ShellExecutorConfig};
pub use context::Context;
pub use deployment::{create_deployment, Deployment, DeploymentConfig};
pub use orchestrator::{Orchestrator, UpdateTarget};
pub use registry::{Node, NodeRegistry, NodeRole};
pub use settings::LifecycleSettings;

// Re-export common error types
pub use pegasus_cluster_common::{Error, Result};
