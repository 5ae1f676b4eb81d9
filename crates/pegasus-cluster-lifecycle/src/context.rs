//! Shared handles for one lifecycle command.

use std::sync::Arc;

use crate::admin::AdminClient;
use crate::deployment::Deployment;
use crate::settings::LifecycleSettings;

/// Everything a lifecycle step needs to talk to the cluster.
#[derive(Clone)]
pub struct Context {
    /// Typed admin queries and commands
    pub admin: AdminClient,
    /// Process management for nodes
    pub deployment: Arc<dyn Deployment>,
    /// Timing policy
    pub settings: LifecycleSettings,
}

impl Context {
    /// Bundle the collaborators of a run
    pub fn new(
        admin: AdminClient,
        deployment: Arc<dyn Deployment>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            admin,
            deployment,
            settings,
        }
    }
}
