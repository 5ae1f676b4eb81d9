//! Downgrading phase handler.

use std::collections::BTreeSet;

use pegasus_cluster_common::{poll_until, Probe};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::admin::Gpid;
use crate::registry::Node;
use crate::{Context, Error, Result};

/// Demote every replica on `node` and return the partitions the meta server
/// proposed to downgrade.
///
/// Proposals are unioned across re-sends, so a partition named only by an
/// early `downgrade_node` is still closed later.
pub async fn downgrade_replicas(ctx: &Context, node: &Node) -> Result<Vec<Gpid>> {
    let admin = &ctx.admin;
    let settings = &ctx.settings;
    let addr = node.address.as_str();
    let proposed = Mutex::new(BTreeSet::new());
    let proposed_ref = &proposed;

    let downgraded = poll_until(
        &settings.bounded_poll(),
        "replicas to downgrade",
        |attempt| async move {
            if settings.should_resend(attempt) {
                let partitions = admin.downgrade_node(addr).await?;
                info!(node = %addr, attempt, proposals = partitions.len(), "sent downgrade_node");
                proposed_ref.lock().await.extend(partitions);
            }
            let primaries = admin.primary_count(addr).await?;
            debug!(node = %addr, primaries, "primary replicas remaining");
            Ok::<_, Error>(Probe::done_if(primaries == 0))
        },
    )
    .await?;

    if !downgraded {
        warn!(node = %addr, "node still reports primaries after downgrade, continuing");
    }

    tokio::time::sleep(settings.settle).await;
    Ok(proposed.into_inner().into_iter().collect())
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
    async fn unions_proposals_across_resends() {
        let mut mock = MockAdminCommandExecutor::new();
        let sends = Arc::new(AtomicUsize::new(0));
        mock.expect_execute()
            .with(eq(AdminRequest::DowngradeNode {
                node: NODE.to_string(),
            }))
            .times(2)
            .returning(move |_| {
                let reply = if sends.fetch_add(1, Ordering::SeqCst) == 0 {
                    "propose 10.0.0.3:34801 2.1 downgrade\npropose 10.0.0.3:34801 1.4 downgrade\n"
                } else {
                    "propose 10.0.0.3:34801 1.4 downgrade\npropose 10.0.0.3:34801 3.0 downgrade\n"
                };
                Ok(reply.to_string())
            });
        let reads = Arc::new(AtomicUsize::new(0));
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(11)
            .returning(move |_| {
                let primaries = if reads.fetch_add(1, Ordering::SeqCst) < 10 { 1 } else { 0 };
                Ok(nodes_output(&[(NODE, "ALIVE", 3, primaries)]))
            });

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        let partitions = downgrade_replicas(&ctx, &node).await.unwrap();
        assert_eq!(
            partitions,
            vec![Gpid::new(1, 4), Gpid::new(2, 1), Gpid::new(3, 0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tolerates_timeout_and_returns_collected_partitions() {
        let mut mock = MockAdminCommandExecutor::new();
        let sends = Arc::new(AtomicUsize::new(0));
        mock.expect_execute()
            .with(eq(AdminRequest::DowngradeNode {
                node: NODE.to_string(),
            }))
            .times(3)
            .returning(move |_| {
                let send = sends.fetch_add(1, Ordering::SeqCst);
                Ok(format!("propose 10.0.0.3:34801 4.{} downgrade\n", send))
            });
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(28)
            .returning(|_| Ok(nodes_output(&[(NODE, "ALIVE", 3, 2)])));

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        let started = tokio::time::Instant::now();
        let partitions = downgrade_replicas(&ctx, &node).await.unwrap();

        assert_eq!(
            partitions,
            vec![Gpid::new(4, 0), Gpid::new(4, 1), Gpid::new(4, 2)]
        );
        assert!(started.elapsed() >= ctx.settings.settle);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_proposal_is_fatal() {
        let mut mock = MockAdminCommandExecutor::new();
        mock.expect_execute()
            .with(eq(AdminRequest::DowngradeNode {
                node: NODE.to_string(),
            }))
            .times(1)
            .returning(|_| Ok("propose 10.0.0.3:34801 garbage\n".to_string()));
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(0);

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        let err = downgrade_replicas(&ctx, &node).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
