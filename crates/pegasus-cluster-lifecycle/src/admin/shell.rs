//! Admin executor backed by the Pegasus tools directory (`run.sh`).
//!
//! Shell requests are fed on stdin to `./run.sh shell --cluster <meta-list>`.
//! `migrate_node` and `downgrade_node` are standalone `run.sh` subcommands.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{AdminCommandExecutor, AdminRequest};
use crate::{Error, Result};

/// Timeout applied to every admin command when none is configured
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

const RUN_SCRIPT: &str = "./run.sh";

/// Settings for [`ShellExecutor`]
#[derive(Clone, Debug)]
pub struct ShellExecutorConfig {
    /// Directory containing `run.sh`
    pub shell_dir: PathBuf,
    /// Meta server addresses of the target cluster
    pub meta_servers: Vec<String>,
    /// Upper bound on one command's runtime
    pub command_timeout: Duration,
}

/// Runs admin requests through the Pegasus `run.sh` tooling.
pub struct ShellExecutor {
    config: ShellExecutorConfig,
    meta_list: String,
}

impl ShellExecutor {
    /// Create an executor; fails if no meta server is configured.
    pub fn new(config: ShellExecutorConfig) -> Result<Self> {
        if config.meta_servers.is_empty() {
            return Err(Error::config("at least one meta server address is required"));
        }
        let meta_list = config.meta_servers.join(",");
        Ok(Self { config, meta_list })
    }

    /// Comma-joined meta server list passed to every command
    pub fn meta_list(&self) -> &str {
        &self.meta_list
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(RUN_SCRIPT);
        cmd.args(args)
            .current_dir(&self.config.shell_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn tool_args<'a>(&'a self, tool: &'a str, node: &'a str) -> [&'a str; 7] {
        [tool, "-c", &self.meta_list, "-n", node, "-t", "run"]
    }

    /// Spawn `cmd`, optionally feed `input` on stdin, and collect stdout+stderr.
    async fn run(&self, mut cmd: Command, description: &str, input: Option<&str>) -> Result<String> {
        if input.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd.spawn().map_err(|e| {
            Error::command_execution(description, format!("failed to execute: {}", e))
        })?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin
                .write_all(format!("{}\n", input).as_bytes())
                .await
                .map_err(|e| Error::command_execution(description, format!("stdin: {}", e)))?;
        }

        let timeout = self.config.command_timeout;
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(command = %description, "timed out after {:?}", timeout);
                Error::command_execution(description, format!("timed out after {:?}", timeout))
            })?
            .map_err(|e| Error::command_execution(description, e.to_string()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            warn!(command = %description, status = %output.status, "command failed");
            return Err(Error::command_execution(
                description,
                format!("{}: {}", output.status, text.trim()),
            ));
        }

        debug!(command = %description, bytes = text.len(), "command finished");
        Ok(text)
    }
}

#[async_trait]
impl AdminCommandExecutor for ShellExecutor {
    async fn execute(&self, request: &AdminRequest) -> Result<String> {
        let description = request.to_string();
        match request {
            AdminRequest::MigrateNode { node } => {
                let cmd = self.command(&self.tool_args("migrate_node", node));
                self.run(cmd, &description, None).await
            }
            AdminRequest::DowngradeNode { node } => {
                let cmd = self.command(&self.tool_args("downgrade_node", node));
                self.run(cmd, &description, None).await
            }
            _ => {
                let cmd = self.command(&["shell", "--cluster", &self.meta_list]);
                self.run(cmd, &description, Some(&description)).await
            }
        }
    }
}
