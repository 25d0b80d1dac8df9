//! Error types for the compatibility layer.
//!
//! [`CompatError`] is what every legacy entry point returns. Store failures
//! convert into it through [`From<StoreError>`], which is where the store's
//! authentication and permission failures become the fixed-code legacy
//! errors.
//!
//! Not-found is not an error: reads and deletes of missing keys produce a
//! 404 [`LegacyResponse`](crate::LegacyResponse).

use etcd_compat_store::{MutatingOperation, Revision, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for compatibility-layer operations.
pub type Result<T> = std::result::Result<T, CompatError>;

/// Errors surfaced by the legacy entry points.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CompatError {
    /// The store did not accept the configured credentials.
    #[error("insufficient credentials code: 401")]
    InsufficientCredentials,

    /// The configured user may not access the key.
    #[error("etcd forbidden code: 403")]
    Forbidden,

    /// The watch start revision has been compacted away.
    #[error("compacted")]
    Compacted {
        /// Oldest revision the store still retains.
        compact_revision: Revision,
    },

    /// The key was modified after the caller read it.
    #[error("value changed before overwritten")]
    ValueChanged,

    /// The store client lacks a mutating operation that must be gated.
    #[error("method {method} not found in etcd client")]
    MissingOperation {
        /// The absent operation.
        method: MutatingOperation,
    },

    /// The caller supplied a value of the wrong shape.
    #[error("invalid value: {message}")]
    InvalidValue {
        /// What was wrong with it.
        message: String,
    },

    /// Local configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Any other store failure, passed through unchanged.
    #[error(transparent)]
    Store(StoreError),
}

impl CompatError {
    /// Creates a new `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue { message: message.into() }
    }

    /// Returns the legacy status code carried by the error, if any.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::InsufficientCredentials => Some(401),
            Self::Forbidden => Some(403),
            _ => None,
        }
    }
}

impl From<StoreError> for CompatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated { .. } => Self::InsufficientCredentials,
            StoreError::PermissionDenied { .. } => Self::Forbidden,
            other => Self::Store(other),
        }
    }
}
