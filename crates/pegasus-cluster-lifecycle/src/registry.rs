//! Run-scoped registry of the cluster's nodes.
//!
//! Populated once per top-level command from the deployment backend and
//! dropped when the command ends. It is the only source of role
//! classification for that run.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::deployment::Deployment;
use crate::{Error, Result};

/// Role of a node in the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Meta server
    Meta,
    /// Replica server
    Replica,
    /// Collector (aggregator)
    Collector,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta => write!(f, "meta"),
            Self::Replica => write!(f, "replica"),
            Self::Collector => write!(f, "collector"),
        }
    }
}

impl FromStr for NodeRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "meta" => Ok(Self::Meta),
            "replica" => Ok(Self::Replica),
            "collector" | "aggregator" => Ok(Self::Collector),
            other => Err(format!("unknown node role '{}'", other)),
        }
    }
}

/// A cluster node as listed by the deployment backend.
///
/// Identity is `(role, address)`; `name` is the alias operators type.
#[derive(Clone, Debug, Eq)]
pub struct Node {
    /// Role of the node
    pub role: NodeRole,
    /// Human alias used for lookup
    pub name: String,
    /// `host:port`
    pub address: String,
}

impl Node {
    /// Create a node
    pub fn new(role: NodeRole, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            address: address.into(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role && self.address == other.address
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.role, self.name, self.address)
    }
}

/// Snapshot of every node known for the current run.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Build a registry from an explicit list
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// List nodes through the backend and build a registry
    pub async fn load(deployment: &dyn Deployment) -> Result<Self> {
        let mut registry = Self::default();
        registry.refresh(deployment).await?;
        Ok(registry)
    }

    /// Replace the whole node list with a fresh listing.
    pub async fn refresh(&mut self, deployment: &dyn Deployment) -> Result<()> {
        self.nodes = deployment.list_all_nodes().await?;
        info!(nodes = self.nodes.len(), "node registry refreshed");
        Ok(())
    }

    /// Find a node by role and name
    pub fn find_by_name(&self, role: NodeRole, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.role == role && n.name == name)
    }

    /// Find a node by role and name, failing with `NodeNotFound`
    pub fn require_by_name(&self, role: NodeRole, name: &str) -> Result<&Node> {
        self.find_by_name(role, name)
            .ok_or_else(|| Error::node_not_found(role.to_string(), name))
    }

    /// Resolve every name, in order, failing on the first unknown one
    pub fn require_all(&self, role: NodeRole, names: &[String]) -> Result<Vec<Node>> {
        names
            .iter()
            .map(|name| self.require_by_name(role, name).cloned())
            .collect()
    }

    /// Nodes with the given role, in listing order
    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    /// Number of known nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
