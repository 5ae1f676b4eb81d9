//! Administrative protocol of a Pegasus cluster.
//!
//! [`AdminRequest`] is the fixed request vocabulary, [`AdminCommandExecutor`]
//! turns a request into raw text (the only seam that touches processes), and
//! [`AdminClient`] layers typed queries on top using the response parser.

mod parser;
mod shell;
mod types;

pub use parser::{
    scan_all, section_rows, Extract, FieldRule, LineMatch, ParsedFields, ResponseParser,
};
pub use shell::{ShellExecutor, ShellExecutorConfig, DEFAULT_COMMAND_TIMEOUT};
pub use types::{
    ClusterIdentity, ClusterInfo, Gpid, HealthyInfo, NodeInfo, NodeStatus, ReplicaCounters,
};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info};

use crate::{Error, Result};

/// Perf-counter filter selecting the serving/opening/closing replica counts
pub const REPLICA_COUNTERS_FILTER: &str = "'.*replica(Count)'";

/// Remote config keys understood by the meta server
pub mod keys {
    /// Max secondaries the balancer may add to one node in a round
    pub const ADD_SECONDARY_MAX_COUNT_FOR_ONE_NODE: &str =
        "meta.lb.add_secondary_max_count_for_one_node";
    /// Nodes that must not receive new secondaries
    pub const ASSIGN_SECONDARY_BLACK_LIST: &str = "meta.lb.assign_secondary_black_list";
    /// Delay before the meta server reassigns a lost replica
    pub const ASSIGN_DELAY_MS: &str = "meta.lb.assign_delay_ms";
    /// Restrict the balancer to primary moves
    pub const ONLY_MOVE_PRIMARY: &str = "meta.lb.only_move_primary";
    /// Fraction of live nodes required before the meta server acts
    pub const LIVE_PERCENTAGE: &str = "meta.live_percentage";
    /// Value that restores a key's built-in default
    pub const DEFAULT: &str = "DEFAULT";
}

/// Acknowledgement markers for remote config commands
pub mod acks {
    /// Generic success marker
    pub const OK: &str = "OK";
    /// Marker returned when setting the secondary black list
    pub const SET_OK: &str = "set ok";
    /// Marker returned by `set_meta_level`
    pub const META_LEVEL_OK: &str = "control meta level ok";
}

/// Balancer aggressiveness of the meta server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaLevel {
    /// Only repair, no proactive balancing
    Steady,
    /// Actively move replicas to balance load
    Lively,
}

impl fmt::Display for MetaLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steady => write!(f, "steady"),
            Self::Lively => write!(f, "lively"),
        }
    }
}

/// The administrative request vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminRequest {
    /// `cluster_info`
    ClusterInfo,
    /// `nodes -d`
    ListNodes,
    /// `ls -d`
    ListApps,
    /// `set_meta_level <level>`
    SetMetaLevel(MetaLevel),
    /// `remote_command -l <target> <command> <args...>`
    RemoteCommand {
        /// Server the command is sent to
        target: String,
        /// Remote command name
        command: String,
        /// Command arguments
        args: Vec<String>,
    },
    /// Ask the meta server to move primaries off a node
    MigrateNode {
        /// Node address
        node: String,
    },
    /// Ask the meta server to demote every replica on a node
    DowngradeNode {
        /// Node address
        node: String,
    },
}

impl AdminRequest {
    /// Build a remote command request
    pub fn remote(target: &str, command: &str, args: &[&str]) -> Self {
        Self::RemoteCommand {
            target: target.to_string(),
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for AdminRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClusterInfo => write!(f, "cluster_info"),
            Self::ListNodes => write!(f, "nodes -d"),
            Self::ListApps => write!(f, "ls -d"),
            Self::SetMetaLevel(level) => write!(f, "set_meta_level {}", level),
            Self::RemoteCommand {
                target,
                command,
                args,
            } => {
                write!(f, "remote_command -l {} {}", target, command)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Self::MigrateNode { node } => write!(f, "migrate_node -n {} -t run", node),
            Self::DowngradeNode { node } => write!(f, "downgrade_node -n {} -t run", node),
        }
    }
}

/// Runs admin requests and returns their raw output.
///
/// Implementations return `Err` only when the command could not be executed
/// to completion. Application-level failures are reported in the output and
/// left to the caller to interpret.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AdminCommandExecutor: Send + Sync {
    /// Execute a request and return its combined output.
    async fn execute(&self, request: &AdminRequest) -> Result<String>;
}

/// Typed queries and commands over an [`AdminCommandExecutor`].
#[derive(Clone)]
pub struct AdminClient {
    executor: Arc<dyn AdminCommandExecutor>,
}

impl AdminClient {
    /// Wrap an executor
    pub fn new(executor: Arc<dyn AdminCommandExecutor>) -> Self {
        Self { executor }
    }

    async fn run(&self, request: AdminRequest) -> Result<String> {
        debug!(request = %request, "issuing admin request");
        self.executor.execute(&request).await
    }

    /// Full cluster summary; fails if any field is missing.
    pub async fn cluster_info(&self) -> Result<ClusterInfo> {
        ClusterInfo::parse(&self.run(AdminRequest::ClusterInfo).await?)
    }

    /// Cluster name and primary meta server.
    pub async fn cluster_identity(&self) -> Result<ClusterIdentity> {
        ClusterInfo::parse_identity(&self.run(AdminRequest::ClusterInfo).await?)
    }

    /// Pending balancer operations, `None` when no longer reported.
    pub async fn balance_operation_count(&self) -> Result<Option<u64>> {
        ClusterInfo::parse_balance_count(&self.run(AdminRequest::ClusterInfo).await?)
    }

    /// Status row of one replica server, `None` if it is not listed.
    pub async fn node_info(&self, address: &str) -> Result<Option<NodeInfo>> {
        NodeInfo::parse(&self.run(AdminRequest::ListNodes).await?, address)
    }

    /// Primary replicas on a node; an unlisted node counts as zero.
    pub async fn primary_count(&self, address: &str) -> Result<u64> {
        Ok(self
            .node_info(address)
            .await?
            .map(|info| info.primary_count)
            .unwrap_or(0))
    }

    /// All replicas on a node; an unlisted node counts as zero.
    pub async fn replica_count(&self, address: &str) -> Result<u64> {
        Ok(self
            .node_info(address)
            .await?
            .map(|info| info.replica_count)
            .unwrap_or(0))
    }

    /// Partition health across all tables.
    pub async fn healthy_info(&self) -> Result<HealthyInfo> {
        HealthyInfo::parse(&self.run(AdminRequest::ListApps).await?)
    }

    /// Serving/opening/closing replica counters of a replica server.
    pub async fn replica_counters(&self, address: &str) -> Result<ReplicaCounters> {
        let request = AdminRequest::remote(address, "perf-counters", &[REPLICA_COUNTERS_FILTER]);
        ReplicaCounters::parse(&self.run(request).await?)
    }

    /// Set a meta server config key and require `expect` exactly once in the reply.
    pub async fn set_remote_config(
        &self,
        meta: &str,
        key: &str,
        value: &str,
        expect: &str,
    ) -> Result<()> {
        let request = AdminRequest::remote(meta, key, &[value]);
        let command = request.to_string();
        let output = self.run(request).await?;
        if output.matches(expect).count() != 1 {
            return Err(Error::CommandRejected {
                command,
                expected: expect.to_string(),
                output,
            });
        }
        info!(key = %key, value = %value, "meta config updated");
        Ok(())
    }

    /// Change balancer aggressiveness.
    pub async fn set_meta_level(&self, level: MetaLevel) -> Result<()> {
        let request = AdminRequest::SetMetaLevel(level);
        let command = request.to_string();
        let output = self.run(request).await?;
        if !output.contains(acks::META_LEVEL_OK) {
            return Err(Error::CommandRejected {
                command,
                expected: acks::META_LEVEL_OK.to_string(),
                output,
            });
        }
        info!(level = %level, "meta level set");
        Ok(())
    }

    /// Propose moving every primary replica off `address`.
    pub async fn migrate_node(&self, address: &str) -> Result<()> {
        self.run(AdminRequest::MigrateNode {
            node: address.to_string(),
        })
        .await
        .map(|_| ())
    }

    /// Propose demoting every replica on `address`; returns the proposed partitions.
    pub async fn downgrade_node(&self, address: &str) -> Result<Vec<Gpid>> {
        let output = self
            .run(AdminRequest::DowngradeNode {
                node: address.to_string(),
            })
            .await?;
        Gpid::parse_proposals(&output)
    }

    /// Close the given partitions on `address`. Safe to repeat.
    pub async fn kill_partitions(&self, address: &str, partitions: &[Gpid]) -> Result<()> {
        for gpid in partitions {
            let gpid = gpid.to_string();
            self.run(AdminRequest::remote(address, "replica.kill_partition", &[&gpid]))
                .await?;
        }
        Ok(())
    }

    /// Flush the shared log of a replica server. The reply is not inspected.
    pub async fn flush_log(&self, address: &str) -> Result<()> {
        self.run(AdminRequest::remote(address, "flush_log", &[]))
            .await
            .map(|_| ())
    }
}
