//! Bounded polling for asynchronous cluster convergence.
//!
//! Cluster-side work such as replica migration or load balancing is only
//! observable by querying state repeatedly. Every such wait goes through
//! [`poll_until`], which gives all callers the same semantics:
//!
//! - the probe reporting [`Probe::Done`] ends the wait with `Ok(true)`
//! - a probe error ends the wait immediately with that error (never retried)
//! - running out of attempts is a *soft* timeout: `Ok(false)`
//!
//! # Example
//!
//! ```ignore
//! use pegasus_cluster_common::poll::{poll_until, PollConfig, Probe};
//!
//! let drained = poll_until(
//!     &PollConfig::bounded(Duration::from_secs(1), 28),
//!     "primary replicas to migrate",
//!     |attempt| async move {
//!         if attempt % 10 == 0 {
//!             admin.migrate_node(addr).await?;
//!         }
//!         Ok(Probe::done_if(admin.primary_count(addr).await? == 0))
//!     },
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Outcome of a single probe invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// Target condition reached
    Done,
    /// Not yet converged, poll again after the configured interval
    Pending,
    /// Not yet converged, poll again after the given delay instead
    PendingFor(Duration),
}

impl Probe {
    /// `Done` when `converged` holds, `Pending` otherwise
    pub fn done_if(converged: bool) -> Self {
        if converged {
            Self::Done
        } else {
            Self::Pending
        }
    }
}

/// Configuration for a convergence wait.
#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay between probe invocations
    pub interval: Duration,
    /// Maximum number of probe invocations (0 = poll forever)
    pub max_attempts: u32,
}

impl PollConfig {
    /// Give up (softly) after `max_attempts` probes
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Poll until the probe reports done or fails
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: 0,
        }
    }

    /// Whether this config ever gives up
    pub fn is_bounded(&self) -> bool {
        self.max_attempts > 0
    }
}

/// Poll `probe` until it converges, fails, or exhausts its attempts.
///
/// The probe receives the zero-based attempt index so it can throttle side
/// effects (re-sending a request every Nth attempt) while still checking
/// status on every attempt.
///
/// # Returns
/// * `Ok(true)` - the probe reported [`Probe::Done`]
/// * `Ok(false)` - `max_attempts` probes ran without convergence
/// * `Err(e)` - the first probe error, returned without sleeping
pub async fn poll_until<F, Fut, E>(
    config: &PollConfig,
    description: &str,
    mut probe: F,
) -> Result<bool, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe, E>>,
{
    let mut attempt = 0u32;

    loop {
        let outcome = probe(attempt).await?;
        attempt += 1;

        let delay = match outcome {
            Probe::Done => {
                debug!(what = %description, attempts = attempt, "converged");
                return Ok(true);
            }
            Probe::Pending => config.interval,
            Probe::PendingFor(delay) => delay,
        };

        if config.is_bounded() && attempt >= config.max_attempts {
            warn!(
                what = %description,
                attempts = attempt,
                "gave up waiting, condition not reached"
            );
            return Ok(false);
        }

        debug!(
            what = %description,
            attempt = attempt,
            delay_ms = delay.as_millis(),
            "not converged yet"
        );
        tokio::time::sleep(delay).await;
    }
}
