//! `pegasus-cluster add-node`: start replica nodes and rebalance onto them.

use std::path::Path;

use clap::Args;

use super::{connect, ClusterArgs};
use crate::Result;

/// Start stopped replica nodes and rebalance the cluster onto them
#[derive(Args, Debug)]
pub struct AddNodeArgs {
    #[command(flatten)]
    pub target: ClusterArgs,

    /// Replica node name (repeatable)
    #[arg(short = 'n', long = "node", required = true)]
    pub nodes: Vec<String>,
}

pub async fn run(config: Option<&Path>, args: AddNodeArgs) -> Result<()> {
    let orchestrator = connect(config, &args.target)?;
    orchestrator.add_nodes(&args.nodes).await?;
    println!(
        "Added {} node(s) to cluster {}: {}",
        args.nodes.len(),
        args.target.cluster,
        args.nodes.join(", ")
    );
    Ok(())
}
