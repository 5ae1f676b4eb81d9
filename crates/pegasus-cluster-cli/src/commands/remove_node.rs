//! `pegasus-cluster remove-node`: drain and stop replica nodes for good.
//!
//! Nodes are removed one at a time; the first failure stops the command and
//! leaves the remaining nodes untouched.

use std::path::Path;

use clap::Args;

use super::{connect, ClusterArgs};
use crate::Result;

/// Drain replica nodes and stop them permanently
#[derive(Args, Debug)]
pub struct RemoveNodeArgs {
    #[command(flatten)]
    pub target: ClusterArgs,

    /// Replica node name (repeatable)
    #[arg(short = 'n', long = "node", required = true)]
    pub nodes: Vec<String>,
}

pub async fn run(config: Option<&Path>, args: RemoveNodeArgs) -> Result<()> {
    let orchestrator = connect(config, &args.target)?;
    orchestrator.remove_nodes(&args.nodes).await?;
    println!(
        "Removed {} node(s) from cluster {}: {}",
        args.nodes.len(),
        args.target.cluster,
        args.nodes.join(", ")
    );
    Ok(())
}
