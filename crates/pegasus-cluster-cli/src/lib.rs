//! pegasus-cluster CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pegasus_cluster_common::telemetry::LogFormat;

/// pegasus-cluster - Safe membership changes for Pegasus clusters
#[derive(Parser, Debug)]
#[command(name = "pegasus-cluster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.pegasus-cluster/config.yaml)
    #[arg(long, global = true, env = "PEGASUS_CLUSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log line format: text or json
    #[arg(long, global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start replica nodes and rebalance onto them
    AddNode(commands::add_node::AddNodeArgs),
    /// Drain and permanently stop replica nodes
    RemoveNode(commands::remove_node::RemoveNodeArgs),
    /// Upgrade nodes one at a time
    RollingUpdate(commands::rolling_update::RollingUpdateArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Commands::AddNode(args) => commands::add_node::run(config, args).await,
            Commands::RemoveNode(args) => commands::remove_node::run(config, args).await,
            Commands::RollingUpdate(args) => commands::rolling_update::run(config, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("pegasus-cluster").chain(args.iter().copied()))
    }

    #[test]
    fn remove_node_collects_repeated_nodes() {
        let cli = parse(&["remove-node", "-c", "onebox", "-n", "r1", "--node", "r2"]).unwrap();
        match cli.command {
            Commands::RemoveNode(args) => {
                assert_eq!(args.target.cluster, "onebox");
                assert_eq!(args.nodes, vec!["r1", "r2"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn cluster_is_required() {
        assert!(parse(&["add-node", "-n", "r1"]).is_err());
    }

    #[test]
    fn add_node_requires_a_node() {
        assert!(parse(&["add-node", "-c", "onebox"]).is_err());
    }

    #[test]
    fn rolling_update_needs_nodes_or_all() {
        assert!(parse(&["rolling-update", "-c", "onebox"]).is_err());
        assert!(parse(&["rolling-update", "-c", "onebox", "-a", "-n", "r1"]).is_err());

        let cli = parse(&["rolling-update", "-c", "onebox", "--all"]).unwrap();
        match cli.command {
            Commands::RollingUpdate(args) => assert!(args.all && args.nodes.is_empty()),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn config_falls_back_to_env_var() {
        std::env::set_var("PEGASUS_CLUSTER_CONFIG", "/tmp/pegasus-env.yaml");
        let from_env = parse(&["add-node", "-c", "onebox", "-n", "r1"]).unwrap();
        let from_flag = parse(&[
            "add-node",
            "-c",
            "onebox",
            "-n",
            "r1",
            "--config",
            "/etc/pegasus/cluster.yaml",
        ])
        .unwrap();
        std::env::remove_var("PEGASUS_CLUSTER_CONFIG");

        assert_eq!(from_env.config, Some(PathBuf::from("/tmp/pegasus-env.yaml")));
        assert_eq!(
            from_flag.config,
            Some(PathBuf::from("/etc/pegasus/cluster.yaml"))
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&[
            "add-node",
            "-c",
            "onebox",
            "-n",
            "r1",
            "--meta-servers",
            "10.0.0.1:34601,10.0.0.2:34601",
            "--log-format",
            "json",
            "--config",
            "/etc/pegasus/cluster.yaml",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pegasus/cluster.yaml")));
        match cli.command {
            Commands::AddNode(args) => assert_eq!(
                args.target.meta_servers,
                vec!["10.0.0.1:34601", "10.0.0.2:34601"]
            ),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
