//! Rejoining phase handler and the cluster-wide health wait.

use pegasus_cluster_common::{poll_until, Probe};
use tracing::{debug, info};

use crate::admin::NodeStatus;
use crate::registry::Node;
use crate::{Context, Error, Result};

/// Wait until the meta server reports `node` as `ALIVE`. Never gives up.
pub async fn wait_for_alive(ctx: &Context, node: &Node) -> Result<()> {
    let admin = &ctx.admin;
    let addr = node.address.as_str();

    poll_until(
        &ctx.settings.unbounded_poll(),
        "node to report alive",
        |_| async move {
            let status = admin
                .node_info(addr)
                .await?
                .map(|info| info.status)
                .unwrap_or(NodeStatus::Unknown);
            debug!(node = %addr, status = %status, "node status");
            Ok::<_, Error>(Probe::done_if(status == NodeStatus::Alive))
        },
    )
    .await?;

    info!(node = %addr, "node is alive");
    Ok(())
}

/// Wait until no partition in the cluster is unhealthy. Never gives up.
pub async fn wait_for_healthy(ctx: &Context) -> Result<()> {
    let admin = &ctx.admin;

    poll_until(
        &ctx.settings.unbounded_poll(),
        "all partitions to become healthy",
        |_| async move {
            let health = admin.healthy_info().await?;
            debug!(
                unhealthy = health.unhealthy,
                partitions = health.partition_count,
                "partition health"
            );
            Ok::<_, Error>(Probe::done_if(health.is_healthy()))
        },
    )
    .await?;

    info!("all partitions healthy");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use mockall::predicate::eq;

    use crate::admin::{AdminRequest, MockAdminCommandExecutor};
    use crate::deployment::MockDeployment;
    use crate::registry::NodeRole;
    use crate::testing::*;

    const NODE: &str = "10.0.0.3:34801";

    #[tokio::test(start_paused = true)]
    async fn waits_past_unlisted_and_unalive_rows() {
        let mut mock = MockAdminCommandExecutor::new();
        let reads = Arc::new(AtomicUsize::new(0));
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(3)
            .returning(move |_| {
                Ok(match reads.fetch_add(1, Ordering::SeqCst) {
                    0 => nodes_output(&[]),
                    1 => nodes_output(&[(NODE, "UNALIVE", 0, 0)]),
                    _ => nodes_output(&[(NODE, "ALIVE", 0, 0)]),
                })
            });

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        wait_for_alive(&ctx, &node).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_wait_has_no_attempt_bound() {
        let mut mock = MockAdminCommandExecutor::new();
        let reads = Arc::new(AtomicUsize::new(0));
        mock.expect_execute()
            .with(eq(AdminRequest::ListApps))
            .times(41)
            .returning(move |_| {
                let unhealthy = if reads.fetch_add(1, Ordering::SeqCst) < 40 { 2 } else { 0 };
                Ok(apps_output(unhealthy))
            });

        let ctx = context(mock, MockDeployment::new());
        wait_for_healthy(&ctx).await.unwrap();
    }
}
