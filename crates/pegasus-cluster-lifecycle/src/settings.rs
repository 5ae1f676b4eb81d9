//! Timing policy for lifecycle operations.

use std::time::Duration;

use pegasus_cluster_common::PollConfig;

/// Poll cadences, attempt bounds, and fixed sleeps used by every command.
#[derive(Clone, Debug)]
pub struct LifecycleSettings {
    /// Delay between convergence probes
    pub poll_interval: Duration,
    /// Probe budget for the migrate, downgrade, and close waits
    pub bounded_attempts: u32,
    /// Re-send the phase's command every this many attempts
    pub resend_every: u32,
    /// Pause after each evacuation step
    pub settle: Duration,
    /// Pause after stopping a removed node
    pub stabilization: Duration,
    /// Sleep between entering lively mode and the first balance check
    pub rebalance_warmup: Duration,
    /// Extra wait once the balancer reports zero pending operations
    pub rebalance_debounce: Duration,
    /// Number of consecutive zero readings needed after the first one
    pub rebalance_debounce_rounds: u32,
    /// Sleep between balance checks while operations are pending
    pub rebalance_busy_interval: Duration,
    /// Fail the rolling update when replicas do not close in time
    pub abort_on_close_timeout: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            bounded_attempts: 28,
            resend_every: 10,
            settle: Duration::from_secs(1),
            stabilization: Duration::from_secs(1),
            rebalance_warmup: Duration::from_secs(180),
            rebalance_debounce: Duration::from_secs(30),
            rebalance_debounce_rounds: 1,
            rebalance_busy_interval: Duration::from_secs(10),
            abort_on_close_timeout: true,
        }
    }
}

impl LifecycleSettings {
    /// Poll policy for waits that may give up
    pub fn bounded_poll(&self) -> PollConfig {
        PollConfig::bounded(self.poll_interval, self.bounded_attempts)
    }

    /// Poll policy for waits that never give up
    pub fn unbounded_poll(&self) -> PollConfig {
        PollConfig::unbounded(self.poll_interval)
    }

    /// Whether the phase command should be (re-)sent on this attempt
    pub fn should_resend(&self, attempt: u32) -> bool {
        attempt % self.resend_every.max(1) == 0
    }
}
