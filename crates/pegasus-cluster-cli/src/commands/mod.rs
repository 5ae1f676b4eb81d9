//! CLI commands

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::debug;

use pegasus_cluster_lifecycle::admin::DEFAULT_COMMAND_TIMEOUT;
use pegasus_cluster_lifecycle::{
    create_deployment, AdminClient, Context, Orchestrator, ShellExecutor, ShellExecutorConfig,
};

use crate::config::{load_config, resolve_config_path};
use crate::{Error, Result};

pub mod add_node;
pub mod remove_node;
pub mod rolling_update;

/// Target cluster selection shared by every command
#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Cluster name, as configured and as reported by its meta servers
    #[arg(short = 'c', long)]
    pub cluster: String,

    /// Meta server addresses, overriding the config file
    #[arg(long, value_delimiter = ',')]
    pub meta_servers: Vec<String>,
}

/// Build an orchestrator for the selected cluster from the config file.
pub fn connect(config_path: Option<&Path>, args: &ClusterArgs) -> Result<Orchestrator> {
    let path = resolve_config_path(config_path)?;
    debug!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    let cluster = config.cluster(&args.cluster)?;

    let meta_servers = if args.meta_servers.is_empty() {
        cluster.meta_servers.clone()
    } else {
        args.meta_servers.clone()
    };
    if meta_servers.is_empty() {
        return Err(Error::config(format!(
            "no meta servers for cluster '{}', set meta_servers or pass --meta-servers",
            args.cluster
        )));
    }

    let executor = ShellExecutor::new(ShellExecutorConfig {
        shell_dir: config.shell_dir.clone(),
        meta_servers,
        command_timeout: config
            .command_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
    })?;

    let ctx = Context::new(
        AdminClient::new(Arc::new(executor)),
        create_deployment(&args.cluster, &cluster.deployment),
        config.timing.settings(),
    );
    Ok(Orchestrator::new(args.cluster.clone(), ctx))
}
