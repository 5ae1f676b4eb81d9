//! Closing phase handler.
//!
//! Kills the downgraded partitions on the node and waits for its serving,
//! opening, and closing replica counters to reach zero. Once the node is
//! empty its shared log is flushed and the secondary throttle is lifted so the
//! balancer can refill the rest of the cluster while the node upgrades.

use pegasus_cluster_common::{poll_until, Probe};
use tracing::{debug, info, warn};

use crate::admin::{acks, keys, Gpid};
use crate::registry::Node;
use crate::{Context, Error, Result};

/// Secondary throttle applied while the node is out of service
const LIFTED_SECONDARY_MAX_COUNT: &str = "100";

/// Close every replica on `node`, killing `partitions` on each resend.
pub async fn close_replicas(
    ctx: &Context,
    meta: &str,
    node: &Node,
    partitions: &[Gpid],
) -> Result<()> {
    let admin = &ctx.admin;
    let settings = &ctx.settings;
    let addr = node.address.as_str();

    let closed = poll_until(
        &settings.bounded_poll(),
        "replicas to close",
        |attempt| async move {
            if settings.should_resend(attempt) && !partitions.is_empty() {
                info!(node = %addr, attempt, partitions = partitions.len(), "killing partitions");
                admin.kill_partitions(addr, partitions).await?;
            }
            let counters = admin.replica_counters(addr).await?;
            debug!(
                node = %addr,
                serving = counters.serving,
                opening = counters.opening,
                closing = counters.closing,
                "replica counters"
            );
            Ok::<_, Error>(Probe::done_if(counters.total() == 0))
        },
    )
    .await?;

    if !closed {
        if settings.abort_on_close_timeout {
            return Err(Error::ConvergenceTimeout(format!(
                "replicas on {} to close",
                addr
            )));
        }
        warn!(node = %addr, "replicas still open after closing, continuing");
    }

    admin.flush_log(addr).await?;
    admin
        .set_remote_config(
            meta,
            keys::ADD_SECONDARY_MAX_COUNT_FOR_ONE_NODE,
            LIFTED_SECONDARY_MAX_COUNT,
            acks::OK,
        )
        .await?;
    Ok(())
}
