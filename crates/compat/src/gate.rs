//! Role-based write authorization.

use std::sync::Arc;

use crate::config::{ConfigSource, DeploymentRole};

/// Outcome of a write authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDecision {
    /// `true` if the write must not reach the store.
    pub denied: bool,
    /// Why the write was denied.
    pub reason: Option<String>,
}

impl WriteDecision {
    /// A permitted write.
    #[must_use]
    pub fn allow() -> Self {
        Self { denied: false, reason: None }
    }

    /// A refused write.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self { denied: true, reason: Some(reason.into()) }
    }
}

/// Decides, per call, whether a mutating operation may proceed.
///
/// The role is re-read from the [`ConfigSource`] for every decision. A
/// configuration that cannot be loaded denies the write; a data-plane role
/// is currently only warned about.
#[derive(Clone)]
pub struct WriteGate {
    source: Arc<dyn ConfigSource>,
}

impl WriteGate {
    /// Creates a gate reading roles from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    /// Authorizes one write.
    pub fn authorize_write(&self) -> WriteDecision {
        let config = match self.source.load() {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(error = %err, "failed to load local configuration, denying write");
                return WriteDecision::deny(err.to_string());
            },
        };

        let role = config.role();
        if role == DeploymentRole::DataPlane {
            tracing::warn!(
                %role,
                "current node is a data plane node, write operations to etcd will be denied in a future release"
            );
        }
        WriteDecision::allow()
    }
}

impl std::fmt::Debug for WriteGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGate").finish_non_exhaustive()
    }
}
