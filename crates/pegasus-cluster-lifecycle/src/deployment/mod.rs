//! Deployment backends: whatever starts, stops, and upgrades node processes.
//!
//! The lifecycle engine only depends on the [`Deployment`] trait. Each
//! operation is long-running and opaque; any error it returns is fatal to the
//! node being processed and is propagated unchanged.

mod script;

pub use script::{ScriptDeployment, ScriptDeploymentConfig};

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

use crate::registry::Node;
use crate::Result;

/// Process-management capabilities required by the lifecycle engine
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Deployment: Send + Sync {
    /// Every node of the cluster with its role
    async fn list_all_nodes(&self) -> Result<Vec<Node>>;

    /// Start a stopped node
    async fn start_node(&self, node: &Node) -> Result<()>;

    /// Stop a running node
    async fn stop_node(&self, node: &Node) -> Result<()>;

    /// Replace the node's binary and restart it
    async fn rolling_update(&self, node: &Node) -> Result<()>;
}

/// Backend selection as written in the configuration file
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentConfig {
    /// Operator-supplied shell command templates
    Script(ScriptDeploymentConfig),
}

/// Instantiate the configured backend for `cluster`
pub fn create_deployment(cluster: &str, config: &DeploymentConfig) -> Arc<dyn Deployment> {
    match config {
        DeploymentConfig::Script(script) => {
            Arc::new(ScriptDeployment::new(cluster, script.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_config_is_selected_by_kind() {
        let yaml = r#"
kind: script
list: ./deploy.sh list {cluster}
start: ./deploy.sh start {cluster} {role} {name}
stop: ./deploy.sh stop {cluster} {role} {name}
rolling_update: ./deploy.sh upgrade {cluster} {role} {name}
"#;
        let config: DeploymentConfig = serde_yaml::from_str(yaml).unwrap();
        let DeploymentConfig::Script(script) = config;
        assert_eq!(script.list, "./deploy.sh list {cluster}");
        assert_eq!(script.rolling_update, "./deploy.sh upgrade {cluster} {role} {name}");
    }
}
