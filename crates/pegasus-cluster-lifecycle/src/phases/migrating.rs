//! MigratingPrimaries phase handler.
//!
//! Stops the balancer from adding secondaries to any node, then asks the meta
//! server to move every primary off the node until `nodes -d` shows none left.

use pegasus_cluster_common::{poll_until, Probe};
use tracing::{debug, info, warn};

use crate::admin::{acks, keys};
use crate::registry::Node;
use crate::{Context, Error, Result};

/// Move all primaries off `node`.
///
/// A node that still holds primaries after the bounded wait is tolerated: the
/// downgrade phase demotes whatever is left.
pub async fn migrate_primaries(ctx: &Context, meta: &str, node: &Node) -> Result<()> {
    let admin = &ctx.admin;
    let settings = &ctx.settings;
    let addr = node.address.as_str();

    admin
        .set_remote_config(meta, keys::ADD_SECONDARY_MAX_COUNT_FOR_ONE_NODE, "0", acks::OK)
        .await?;

    let migrated = poll_until(
        &settings.bounded_poll(),
        "primary replicas to migrate",
        |attempt| async move {
            if settings.should_resend(attempt) {
                info!(node = %addr, attempt, "sending migrate_node");
                admin.migrate_node(addr).await?;
            }
            let primaries = admin.primary_count(addr).await?;
            debug!(node = %addr, primaries, "primary replicas remaining");
            Ok::<_, Error>(Probe::done_if(primaries == 0))
        },
    )
    .await?;

    if !migrated {
        warn!(node = %addr, "primaries still present after migration, continuing");
    }

    tokio::time::sleep(settings.settle).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use mockall::predicate::eq;

    use crate::admin::{AdminRequest, MockAdminCommandExecutor};
    use crate::deployment::MockDeployment;
    use crate::registry::NodeRole;
    use crate::testing::*;

    const NODE: &str = "10.0.0.3:34801";

    fn throttle_ack(mock: &mut MockAdminCommandExecutor) {
        mock.expect_execute()
            .with(eq(AdminRequest::remote(
                META,
                keys::ADD_SECONDARY_MAX_COUNT_FOR_ONE_NODE,
                &["0"],
            )))
            .times(1)
            .returning(|_| Ok("OK\n".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn resends_migrate_every_tenth_attempt_and_tolerates_timeout() {
        let mut mock = MockAdminCommandExecutor::new();
        throttle_ack(&mut mock);
        mock.expect_execute()
            .with(eq(AdminRequest::MigrateNode {
                node: NODE.to_string(),
            }))
            .times(3)
            .returning(|_| Ok(String::new()));
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(28)
            .returning(|_| Ok(nodes_output(&[(NODE, "ALIVE", 6, 2)])));

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        migrate_primaries(&ctx, META, &node).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_polling_once_primaries_drained() {
        let mut mock = MockAdminCommandExecutor::new();
        throttle_ack(&mut mock);
        mock.expect_execute()
            .with(eq(AdminRequest::MigrateNode {
                node: NODE.to_string(),
            }))
            .times(1)
            .returning(|_| Ok(String::new()));
        let remaining = Arc::new(AtomicU64::new(3));
        mock.expect_execute()
            .with(eq(AdminRequest::ListNodes))
            .times(4)
            .returning(move |_| {
                let p = remaining.load(Ordering::SeqCst);
                remaining.store(p.saturating_sub(1), Ordering::SeqCst);
                Ok(nodes_output(&[(NODE, "ALIVE", 6, p)]))
            });

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        migrate_primaries(&ctx, META, &node).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_throttle_aborts_before_migrating() {
        let mut mock = MockAdminCommandExecutor::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok("ERR: unknown config\n".to_string()));

        let ctx = context(mock, MockDeployment::new());
        let node = Node::new(NodeRole::Replica, "r1", NODE);
        let err = migrate_primaries(&ctx, META, &node).await.unwrap_err();
        assert!(matches!(err, Error::CommandRejected { .. }));
    }
}
