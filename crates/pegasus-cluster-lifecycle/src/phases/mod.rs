//! Phase handlers for the per-node rolling update.
//!
//! A replica node moves through
//! `Active → MigratingPrimaries → Downgrading → Closing → Upgrading →
//! Rejoining → Healthy`. Each evacuation phase lives in its own module so it
//! can be tested against a scripted admin executor. There is no rollback: a
//! fatal error stops the machine and leaves the node where it was.

mod closing;
mod downgrading;
mod migrating;
mod rejoining;

pub use closing::close_replicas;
pub use downgrading::downgrade_replicas;
pub use migrating::migrate_primaries;
pub use rejoining::{wait_for_alive, wait_for_healthy};

use std::fmt;

use tracing::{info, warn};

use crate::registry::Node;
use crate::{Context, Result};

/// Position of a node in the rolling update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Serving normally, nothing done yet
    Active,
    /// Moving primary replicas to other nodes
    MigratingPrimaries,
    /// Demoting the remaining replicas
    Downgrading,
    /// Waiting for every replica on the node to close
    Closing,
    /// Backend is replacing the binary and restarting
    Upgrading,
    /// Waiting for the node to report alive and the cluster to heal
    Rejoining,
    /// Upgrade finished and all partitions healthy
    Healthy,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::MigratingPrimaries => write!(f, "MigratingPrimaries"),
            Self::Downgrading => write!(f, "Downgrading"),
            Self::Closing => write!(f, "Closing"),
            Self::Upgrading => write!(f, "Upgrading"),
            Self::Rejoining => write!(f, "Rejoining"),
            Self::Healthy => write!(f, "Healthy"),
        }
    }
}

/// Rolling update of a single replica node.
pub struct RollingUpdate<'a> {
    ctx: &'a Context,
    meta: &'a str,
    node: &'a Node,
    phase: UpdatePhase,
    history: Vec<UpdatePhase>,
}

impl<'a> RollingUpdate<'a> {
    /// Prepare an update of `node`; config changes go to the meta server `meta`.
    pub fn new(ctx: &'a Context, meta: &'a str, node: &'a Node) -> Self {
        Self {
            ctx,
            meta,
            node,
            phase: UpdatePhase::Active,
            history: vec![UpdatePhase::Active],
        }
    }

    /// Current phase
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    fn transition(&mut self, next: UpdatePhase) {
        info!(node = %self.node.address, from = %self.phase, to = %next, "rolling update phase");
        self.phase = next;
        self.history.push(next);
    }

    /// Drive the node through every phase and return the phases visited.
    pub async fn run(mut self) -> Result<Vec<UpdatePhase>> {
        match self.drive().await {
            Ok(()) => Ok(self.history),
            Err(e) => {
                warn!(
                    node = %self.node.address,
                    phase = %self.phase,
                    error = %e,
                    "rolling update stopped, node left in partial state"
                );
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let (ctx, meta, node) = (self.ctx, self.meta, self.node);

        self.transition(UpdatePhase::MigratingPrimaries);
        migrate_primaries(ctx, meta, node).await?;

        self.transition(UpdatePhase::Downgrading);
        let partitions = downgrade_replicas(ctx, node).await?;

        self.transition(UpdatePhase::Closing);
        close_replicas(ctx, meta, node, &partitions).await?;

        self.transition(UpdatePhase::Upgrading);
        ctx.deployment.rolling_update(node).await?;

        self.transition(UpdatePhase::Rejoining);
        wait_for_alive(ctx, node).await?;
        wait_for_healthy(ctx).await?;

        self.transition(UpdatePhase::Healthy);
        Ok(())
    }
}
