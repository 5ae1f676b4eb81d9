//! Permanent removal of replica nodes.
//!
//! Before any node is touched, all of them are black-listed for new
//! secondaries and the meta server's live-percentage guard is dropped so it
//! keeps acting while nodes disappear. Each node is then drained and stopped
//! in turn.

use pegasus_cluster_common::{poll_until, Probe};
use tracing::{debug, info};

use crate::admin::{acks, keys, MetaLevel};
use crate::phases::wait_for_healthy;
use crate::registry::Node;
use crate::{Context, Error, Result};

/// Reassignment delay while a node is being drained
const DRAIN_ASSIGN_DELAY_MS: &str = "10";

/// Black-list `nodes` and disable the live-percentage guard on `meta`.
pub async fn prepare_removal(ctx: &Context, meta: &str, nodes: &[Node]) -> Result<()> {
    let black_list = nodes
        .iter()
        .map(|n| n.address.as_str())
        .collect::<Vec<_>>()
        .join(",");
    info!(black_list = %black_list, "black-listing nodes for new secondaries");

    ctx.admin
        .set_remote_config(meta, keys::ASSIGN_SECONDARY_BLACK_LIST, &black_list, acks::SET_OK)
        .await?;
    ctx.admin
        .set_remote_config(meta, keys::LIVE_PERCENTAGE, "0", acks::OK)
        .await?;
    Ok(())
}

/// Drain `node` of every replica, stop it, and wait for the cluster to heal.
pub async fn remove_node(ctx: &Context, meta: &str, node: &Node) -> Result<()> {
    let admin = &ctx.admin;
    let settings = &ctx.settings;
    let addr = node.address.as_str();
    info!(node = %node, "removing node");

    admin.set_meta_level(MetaLevel::Steady).await?;
    admin
        .set_remote_config(meta, keys::ASSIGN_DELAY_MS, DRAIN_ASSIGN_DELAY_MS, acks::OK)
        .await?;

    admin.migrate_node(addr).await?;
    poll_until(
        &settings.unbounded_poll(),
        "primary replicas to migrate",
        |_| async move {
            let primaries = admin.primary_count(addr).await?;
            debug!(node = %addr, primaries, "primary replicas remaining");
            Ok::<_, Error>(Probe::done_if(primaries == 0))
        },
    )
    .await?;
    tokio::time::sleep(settings.settle).await;

    let partitions = admin.downgrade_node(addr).await?;
    info!(node = %addr, proposals = partitions.len(), "sent downgrade_node");
    poll_until(
        &settings.unbounded_poll(),
        "replicas to move off the node",
        |_| async move {
            let replicas = admin.replica_count(addr).await?;
            debug!(node = %addr, replicas, "replicas remaining");
            Ok::<_, Error>(Probe::done_if(replicas == 0))
        },
    )
    .await?;
    tokio::time::sleep(settings.settle).await;

    admin.kill_partitions(addr, &partitions).await?;

    ctx.deployment.stop_node(node).await?;
    info!(node = %addr, "node stopped");
    tokio::time::sleep(settings.stabilization).await;

    wait_for_healthy(ctx).await?;

    admin
        .set_remote_config(meta, keys::ASSIGN_DELAY_MS, keys::DEFAULT, acks::OK)
        .await?;
    info!(node = %addr, "node removed");
    Ok(())
}
