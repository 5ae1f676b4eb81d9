//! `pegasus-cluster rolling-update`: upgrade nodes one at a time.
//!
//! # Usage
//!
//! ```bash
//! # Upgrade two replica nodes
//! pegasus-cluster rolling-update -c onebox -n r1 -n r2
//!
//! # Upgrade every replica, then meta servers and collectors
//! pegasus-cluster rolling-update -c onebox --all
//! ```

use std::path::Path;

use clap::Args;

use pegasus_cluster_lifecycle::UpdateTarget;

use super::{connect, ClusterArgs};
use crate::Result;

/// Upgrade replica nodes without losing availability
#[derive(Args, Debug)]
pub struct RollingUpdateArgs {
    #[command(flatten)]
    pub target: ClusterArgs,

    /// Replica node name (repeatable)
    #[arg(short = 'n', long = "node", required_unless_present = "all", conflicts_with = "all")]
    pub nodes: Vec<String>,

    /// Update every replica node, then every meta server and collector
    #[arg(short = 'a', long)]
    pub all: bool,
}

impl RollingUpdateArgs {
    fn update_target(&self) -> UpdateTarget {
        if self.all {
            UpdateTarget::All
        } else {
            UpdateTarget::Nodes(self.nodes.clone())
        }
    }
}

pub async fn run(config: Option<&Path>, args: RollingUpdateArgs) -> Result<()> {
    let orchestrator = connect(config, &args.target)?;
    orchestrator
        .rolling_update_nodes(&args.update_target())
        .await?;
    if args.all {
        println!("Rolling update of cluster {} finished", args.target.cluster);
    } else {
        println!(
            "Rolling update of {} node(s) in cluster {} finished: {}",
            args.nodes.len(),
            args.target.cluster,
            args.nodes.join(", ")
        );
    }
    Ok(())
}
