//! Top-level membership commands: add, remove, and rolling update.
//!
//! Every command runs the same preflight before it changes anything:
//! duplicate names are rejected, the node registry is loaded from the
//! deployment backend, every requested name is resolved, and the meta servers
//! are checked to belong to the named cluster. Nodes are then processed
//! strictly in order and the first error ends the command.

use std::collections::HashSet;

use tracing::info;

use crate::admin::{acks, keys, MetaLevel};
use crate::phases::RollingUpdate;
use crate::rebalance::rebalance;
use crate::registry::{Node, NodeRegistry, NodeRole};
use crate::removal::{prepare_removal, remove_node};
use crate::{Context, Error, Result};

/// Which replica nodes a rolling update covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    /// The named replica nodes, in the given order
    Nodes(Vec<String>),
    /// Every replica node, then every meta server and collector
    All,
}

/// Result of the shared preflight.
struct Preflight {
    registry: NodeRegistry,
    nodes: Vec<Node>,
    primary_meta: String,
}

/// Runs membership changes against one named cluster.
pub struct Orchestrator {
    cluster: String,
    ctx: Context,
}

impl Orchestrator {
    /// Create an orchestrator for `cluster`
    pub fn new(cluster: impl Into<String>, ctx: Context) -> Self {
        Self {
            cluster: cluster.into(),
            ctx,
        }
    }

    /// Name of the target cluster
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Start stopped replica nodes and rebalance onto them.
    pub async fn add_nodes(&self, names: &[String]) -> Result<()> {
        let preflight = self.preflight(Some(names)).await?;
        let admin = &self.ctx.admin;

        admin.set_meta_level(MetaLevel::Steady).await?;
        let total = preflight.nodes.len();
        for (i, node) in preflight.nodes.iter().enumerate() {
            info!(node = %node, progress = %format!("{}/{}", i + 1, total), "starting node");
            self.ctx.deployment.start_node(node).await?;
        }

        rebalance(&self.ctx, &preflight.primary_meta, false).await?;
        info!(cluster = %self.cluster, nodes = total, "nodes added");
        Ok(())
    }

    /// Drain and stop replica nodes permanently.
    pub async fn remove_nodes(&self, names: &[String]) -> Result<()> {
        let preflight = self.preflight(Some(names)).await?;
        let meta = preflight.primary_meta.as_str();

        prepare_removal(&self.ctx, meta, &preflight.nodes).await?;
        let total = preflight.nodes.len();
        for (i, node) in preflight.nodes.iter().enumerate() {
            info!(progress = %format!("{}/{}", i + 1, total), "removing node {}", node.name);
            remove_node(&self.ctx, meta, node).await?;
        }

        info!(cluster = %self.cluster, nodes = total, "nodes removed");
        Ok(())
    }

    /// Upgrade replica nodes one at a time without losing availability.
    pub async fn rolling_update_nodes(&self, target: &UpdateTarget) -> Result<()> {
        let preflight = match target {
            UpdateTarget::Nodes(names) => self.preflight(Some(names)).await?,
            UpdateTarget::All => self.preflight(None).await?,
        };
        let admin = &self.ctx.admin;
        let meta = preflight.primary_meta.as_str();

        admin.set_meta_level(MetaLevel::Steady).await?;
        let total = preflight.nodes.len();
        for (i, node) in preflight.nodes.iter().enumerate() {
            info!(node = %node, progress = %format!("{}/{}", i + 1, total), "rolling update");
            RollingUpdate::new(&self.ctx, meta, node).run().await?;
        }
        admin
            .set_remote_config(
                meta,
                keys::ADD_SECONDARY_MAX_COUNT_FOR_ONE_NODE,
                keys::DEFAULT,
                acks::OK,
            )
            .await?;

        if *target == UpdateTarget::All {
            for role in [NodeRole::Meta, NodeRole::Collector] {
                for node in preflight.registry.nodes_with_role(role) {
                    info!(node = %node, "rolling update");
                    self.ctx.deployment.rolling_update(node).await?;
                }
            }
            rebalance(&self.ctx, meta, false).await?;
        }

        info!(cluster = %self.cluster, replicas = total, "rolling update finished");
        Ok(())
    }

    /// Reject bad requests before any cluster-mutating command is issued.
    ///
    /// `None` selects every replica node in listing order.
    async fn preflight(&self, names: Option<&[String]>) -> Result<Preflight> {
        if let Some(names) = names {
            reject_duplicates(names)?;
        }

        let registry = NodeRegistry::load(self.ctx.deployment.as_ref()).await?;
        let nodes = match names {
            Some(names) => registry.require_all(NodeRole::Replica, names)?,
            None => registry.nodes_with_role(NodeRole::Replica).cloned().collect(),
        };

        let primary_meta = self.validate_identity().await?;
        Ok(Preflight {
            registry,
            nodes,
            primary_meta,
        })
    }

    /// Confirm the meta servers serve this cluster and return the primary meta.
    async fn validate_identity(&self) -> Result<String> {
        let identity = self.ctx.admin.cluster_identity().await?;
        match identity.cluster_name.as_deref() {
            Some(name) if name == self.cluster => {
                info!(
                    cluster = %self.cluster,
                    primary_meta = %identity.primary_meta_server,
                    "cluster identity confirmed"
                );
                Ok(identity.primary_meta_server)
            }
            Some(name) => Err(Error::validation(format!(
                "meta servers belong to cluster '{}', not '{}'",
                name, self.cluster
            ))),
            None => Err(Error::validation(format!(
                "cluster_info does not report a zookeeper root, cannot confirm cluster '{}'",
                self.cluster
            ))),
        }
    }
}

fn reject_duplicates(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(Error::validation("no node names given"));
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(Error::validation(format!("duplicate node name '{}'", name)));
        }
    }
    Ok(())
}
