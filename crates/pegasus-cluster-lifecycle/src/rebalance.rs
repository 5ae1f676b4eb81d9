//! Rebalance controller.
//!
//! Switches the meta server to lively mode and waits until the balancer
//! reports no pending operations. A zero reading is only trusted after a
//! debounce round, since the balancer plans its next batch asynchronously and
//! can briefly report zero between batches.

use std::sync::atomic::{AtomicU32, Ordering};

use pegasus_cluster_common::{poll_until, Probe};
use tracing::{debug, info};

use crate::admin::{acks, keys, MetaLevel};
use crate::{Context, Error, Result};

/// Let the balancer run until the cluster is balanced, then return to steady mode.
///
/// With `primary_only` the balancer is restricted to primary moves for the
/// duration of the call.
pub async fn rebalance(ctx: &Context, meta: &str, primary_only: bool) -> Result<()> {
    let admin = &ctx.admin;
    let settings = &ctx.settings;

    if primary_only {
        admin
            .set_remote_config(meta, keys::ONLY_MOVE_PRIMARY, "true", acks::OK)
            .await?;
    }
    admin.set_meta_level(MetaLevel::Lively).await?;

    info!(
        warmup_secs = settings.rebalance_warmup.as_secs(),
        primary_only, "balancer started, waiting for warm-up"
    );
    tokio::time::sleep(settings.rebalance_warmup).await;

    let zero_readings = AtomicU32::new(0);
    let zero_readings = &zero_readings;
    poll_until(
        &settings.unbounded_poll(),
        "balance operations to finish",
        |_| async move {
            let probe = match admin.balance_operation_count().await? {
                None => {
                    debug!("balance operation count no longer reported");
                    Probe::Done
                }
                Some(0) => {
                    let seen = zero_readings.fetch_add(1, Ordering::SeqCst) + 1;
                    if seen > settings.rebalance_debounce_rounds {
                        Probe::Done
                    } else {
                        debug!(seen, "no pending balance operations, confirming");
                        Probe::PendingFor(settings.rebalance_debounce)
                    }
                }
                Some(pending) => {
                    zero_readings.store(0, Ordering::SeqCst);
                    info!(pending, "balance operations pending");
                    Probe::PendingFor(settings.rebalance_busy_interval)
                }
            };
            Ok::<_, Error>(probe)
        },
    )
    .await?;
    info!("cluster balanced");

    admin.set_meta_level(MetaLevel::Steady).await?;
    if primary_only {
        admin
            .set_remote_config(meta, keys::ONLY_MOVE_PRIMARY, "false", acks::OK)
            .await?;
    }
    Ok(())
}
