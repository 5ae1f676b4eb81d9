//! Deployment backend driven by operator shell commands.
//!
//! Each operation is a command template run through `sh -c`. Templates may
//! use `{cluster}`, `{role}`, `{name}`, and `{address}`. The `list` command
//! prints one node per line as `<role> <name> <host:port>`.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{info, warn};

use super::Deployment;
use crate::registry::{Node, NodeRole};
use crate::{Error, Result};

/// Command templates for [`ScriptDeployment`]
#[derive(Clone, Debug, Deserialize)]
pub struct ScriptDeploymentConfig {
    /// Prints the node listing
    pub list: String,
    /// Starts one node
    pub start: String,
    /// Stops one node
    pub stop: String,
    /// Upgrades and restarts one node
    pub rolling_update: String,
    /// Working directory for every command
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Runs configured shell commands for each deployment operation.
pub struct ScriptDeployment {
    cluster: String,
    config: ScriptDeploymentConfig,
}

impl ScriptDeployment {
    /// Create a backend for `cluster`
    pub fn new(cluster: impl Into<String>, config: ScriptDeploymentConfig) -> Self {
        Self {
            cluster: cluster.into(),
            config,
        }
    }

    fn render(&self, template: &str, node: Option<&Node>) -> String {
        let rendered = template.replace("{cluster}", &self.cluster);
        match node {
            Some(node) => rendered
                .replace("{role}", &node.role.to_string())
                .replace("{name}", &node.name)
                .replace("{address}", &node.address),
            None => rendered,
        }
    }

    async fn run(&self, template: &str, node: Option<&Node>) -> Result<String> {
        let command = self.render(template, node);
        info!(command = %command, "running deployment command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| Error::backend(format!("failed to execute `{}`: {}", command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(command = %command, status = %output.status, "deployment command failed");
            return Err(Error::backend(format!(
                "`{}` exited with {}: {}",
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse the `list` command output.
pub(crate) fn parse_node_listing(output: &str) -> Result<Vec<Node>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [role, name, address] = fields[..] else {
                return Err(Error::backend(format!(
                    "malformed node listing line '{}', expected <role> <name> <host:port>",
                    line
                )));
            };
            let role: NodeRole = role.parse().map_err(Error::backend)?;
            Ok(Node::new(role, name, address))
        })
        .collect()
}

#[async_trait]
impl Deployment for ScriptDeployment {
    async fn list_all_nodes(&self) -> Result<Vec<Node>> {
        let output = self.run(&self.config.list, None).await?;
        parse_node_listing(&output)
    }

    async fn start_node(&self, node: &Node) -> Result<()> {
        self.run(&self.config.start, Some(node)).await.map(|_| ())
    }

    async fn stop_node(&self, node: &Node) -> Result<()> {
        self.run(&self.config.stop, Some(node)).await.map(|_| ())
    }

    async fn rolling_update(&self, node: &Node) -> Result<()> {
        self.run(&self.config.rolling_update, Some(node))
            .await
            .map(|_| ())
    }
}
