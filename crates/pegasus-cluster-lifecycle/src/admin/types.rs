//! Typed snapshots of cluster state parsed from admin responses
//!
//! Every type here is a point-in-time view. Consumers that need fresh data
//! re-query instead of caching.

use std::fmt;
use std::str::FromStr;

use super::parser::{scan_all, section_rows, Extract, FieldRule, LineMatch, ResponseParser};
use crate::{Error, Result};

fn prefix(p: &str) -> LineMatch {
    LineMatch::Prefix(p.to_string())
}

/// Cluster-wide summary from `cluster_info`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Last path segment of `zookeeper_root`, when reported
    pub cluster_name: Option<String>,
    /// Address of the meta server currently acting as primary
    pub primary_meta_server: String,
    /// Outstanding balancer operations (`total=` of `balance_operation_count`)
    pub balance_operation_count: u64,
}

impl ClusterInfo {
    fn parser(balance_required: bool) -> ResponseParser {
        let balance = Extract::after("total=");
        let balance_rule = if balance_required {
            FieldRule::required("balance_operation_count", prefix("balance_operation_count"), balance)
        } else {
            FieldRule::optional("balance_operation_count", prefix("balance_operation_count"), balance)
        };
        ResponseParser::new("cluster info")
            .field(FieldRule::required(
                "primary_meta_server",
                prefix("primary_meta_server"),
                Extract::LastToken,
            ))
            .field(FieldRule::optional(
                "zookeeper_root",
                prefix("zookeeper_root"),
                Extract::LastToken,
            ))
            .field(balance_rule)
    }

    /// Parse `cluster_info` output; all of primary meta and balance count are required.
    pub fn parse(output: &str) -> Result<Self> {
        let fields = Self::parser(true).parse(output)?;
        Ok(Self {
            cluster_name: fields.get("zookeeper_root").and_then(cluster_name_from_root),
            primary_meta_server: fields.text("primary_meta_server")?.to_string(),
            balance_operation_count: fields.value("balance_operation_count")?,
        })
    }

    /// Cluster name and primary meta server, tolerating a missing balance line.
    pub fn parse_identity(output: &str) -> Result<ClusterIdentity> {
        let fields = Self::parser(false).parse(output)?;
        Ok(ClusterIdentity {
            cluster_name: fields.get("zookeeper_root").and_then(cluster_name_from_root),
            primary_meta_server: fields.text("primary_meta_server")?.to_string(),
        })
    }

    /// Only the pending balance count; `None` once the meta server stops reporting it.
    pub fn parse_balance_count(output: &str) -> Result<Option<u64>> {
        let parser = ResponseParser::new("balance operation count").field(FieldRule::optional(
            "balance_operation_count",
            LineMatch::Contains("balance_operation_count".to_string()),
            Extract::after("total="),
        ));
        parser.parse(output)?.optional_value("balance_operation_count")
    }
}

/// Identity fields used to confirm the meta list belongs to the named cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterIdentity {
    /// Last path segment of `zookeeper_root`, when reported
    pub cluster_name: Option<String>,
    /// Address of the primary meta server
    pub primary_meta_server: String,
}

fn cluster_name_from_root(root: &str) -> Option<String> {
    root.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Liveness of a replica server as seen by the meta server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    /// Reported `ALIVE`
    Alive,
    /// Reported `UNALIVE`
    Unalive,
    /// Anything else
    Unknown,
}

impl From<&str> for NodeStatus {
    fn from(s: &str) -> Self {
        match s {
            "ALIVE" => Self::Alive,
            "UNALIVE" => Self::Unalive,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "ALIVE"),
            Self::Unalive => write!(f, "UNALIVE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One row of `nodes -d`.
///
/// Columns: `address status replica_count primary_count secondary_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// Liveness
    pub status: NodeStatus,
    /// Total replicas hosted
    pub replica_count: u64,
    /// Replicas serving as primary
    pub primary_count: u64,
    /// Replicas serving as secondary
    pub secondary_count: u64,
}

impl NodeInfo {
    /// Parse the row for `address`; `Ok(None)` when the address is not listed.
    pub fn parse(output: &str, address: &str) -> Result<Option<Self>> {
        let row = || LineMatch::FirstToken(address.to_string());
        let fields = ResponseParser::new(format!("node info of {}", address))
            .field(FieldRule::optional("status", row(), Extract::Token(1)))
            .field(FieldRule::optional("replica_count", row(), Extract::Token(2)))
            .field(FieldRule::optional("primary_count", row(), Extract::Token(3)))
            .field(FieldRule::optional("secondary_count", row(), Extract::Token(4)))
            .parse(output)?;

        let Some(status) = fields.get("status") else {
            return Ok(None);
        };
        Ok(Some(Self {
            status: NodeStatus::from(status),
            replica_count: fields.value("replica_count")?,
            primary_count: fields.value("primary_count")?,
            secondary_count: fields.value("secondary_count")?,
        }))
    }
}

/// Partition health summed over every table in `ls -d`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealthyInfo {
    /// Total partitions
    pub partition_count: u64,
    /// Partitions with a primary and all secondaries
    pub fully_healthy: u64,
    /// Partitions missing at least one replica
    pub unhealthy: u64,
    /// Partitions that cannot accept writes
    pub write_unhealthy: u64,
    /// Partitions that cannot serve reads
    pub read_unhealthy: u64,
}

impl HealthyInfo {
    /// Parse the `[healthy_info]` section of `ls -d`.
    ///
    /// Columns: `app_id app_name partition_count fully_healthy unhealthy
    /// write_unhealthy read_unhealthy`.
    pub fn parse(output: &str) -> Result<Self> {
        let rows = section_rows(output, "healthy_info")
            .ok_or_else(|| Error::parse("healthy info (missing [healthy_info] section)", output))?;

        let column = |row: &[&str], index: usize| -> Result<u64> {
            row.get(index)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| Error::parse(format!("healthy info row '{}'", row.join(" ")), output))
        };

        let mut info = Self::default();
        for row in rows {
            info.partition_count += column(&row, 2)?;
            info.fully_healthy += column(&row, 3)?;
            info.unhealthy += column(&row, 4)?;
            info.write_unhealthy += column(&row, 5)?;
            info.read_unhealthy += column(&row, 6)?;
        }
        Ok(info)
    }

    /// No partition is missing a replica
    pub fn is_healthy(&self) -> bool {
        self.unhealthy == 0
    }
}

/// Replica counters from a replica server's perf counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicaCounters {
    /// `replica*eon.replica_stub*replica(Count)`
    pub serving: u64,
    /// `replica*eon.replica_stub*opening.replica(Count)`
    pub opening: u64,
    /// `replica*eon.replica_stub*closing.replica(Count)`
    pub closing: u64,
}

impl ReplicaCounters {
    /// Parse perf-counter output; all three counters are required.
    ///
    /// Counter names are `<app>*<section>*<name>`, so the separators around
    /// the name segments are matched as wildcards.
    pub fn parse(output: &str) -> Result<Self> {
        let counter = |name: &str| {
            Extract::after_pattern(format!(
                r#"replica_stub?{}(Count)","type":"NUMBER","value":"#,
                name
            ))
        };
        let fields = ResponseParser::new("replica perf counters")
            .field(FieldRule::required("serving", LineMatch::Any, counter("replica")))
            .field(FieldRule::required("opening", LineMatch::Any, counter("opening?replica")))
            .field(FieldRule::required("closing", LineMatch::Any, counter("closing?replica")))
            .parse(output)?;

        // Counter values may be rendered as doubles ("value":2.0)
        let count = |name: &str| fields.value::<f64>(name).map(|v| v as u64);
        Ok(Self {
            serving: count("serving")?,
            opening: count("opening")?,
            closing: count("closing")?,
        })
    }

    /// Replicas not yet fully closed
    pub fn total(&self) -> u64 {
        self.serving + self.opening + self.closing
    }
}

/// Global partition id: `<app_id>.<partition_index>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gpid {
    /// Application (table) id
    pub app_id: i32,
    /// Partition index within the application
    pub partition_index: i32,
}

impl Gpid {
    /// Create a partition id
    pub fn new(app_id: i32, partition_index: i32) -> Self {
        Self {
            app_id,
            partition_index,
        }
    }

    /// Partition ids named by the `propose` lines of a downgrade response.
    ///
    /// Line layout: `propose <target> <app_id>.<partition_index> ...`.
    pub fn parse_proposals(output: &str) -> Result<Vec<Self>> {
        let rule = FieldRule::required(
            "gpid",
            LineMatch::Prefix("propose ".to_string()),
            Extract::Token(2),
        );
        scan_all(output, &rule)
            .into_iter()
            .map(|text| {
                text.parse()
                    .map_err(|_| Error::parse(format!("partition id '{}'", text), output))
            })
            .collect()
    }
}

impl FromStr for Gpid {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (app, index) = s
            .split_once('.')
            .ok_or_else(|| format!("expected <app_id>.<partition_index>, got '{}'", s))?;
        Ok(Self {
            app_id: app.parse().map_err(|_| format!("invalid app id in '{}'", s))?,
            partition_index: index
                .parse()
                .map_err(|_| format!("invalid partition index in '{}'", s))?,
        })
    }
}

impl fmt::Display for Gpid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_id, self.partition_index)
    }
}
