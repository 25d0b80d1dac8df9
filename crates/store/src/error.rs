//! Store error types and result alias.
//!
//! Every client implementation maps its transport and server failures onto
//! [`StoreError`] at the client boundary, so callers match on variants
//! instead of inspecting message strings.
//!
//! # Error Types
//!
//! - [`StoreError::Unauthenticated`] - the store rejected the credentials
//! - [`StoreError::PermissionDenied`] - the credentials lack access to the key
//! - [`StoreError::Server`] - any other store-reported failure, passed through opaquely
//! - [`StoreError::LeaseNotFound`] - a lease operation referenced an unknown lease
//! - [`StoreError::WriteDenied`] - a write gate refused a mutating call
//! - [`StoreError::Connection`] - transport failure or a closed client
//! - [`StoreError::Timeout`] - the configured client timeout elapsed
//!
//! # Example
//!
//! ```
//! use etcd_compat_store::StoreError;
//!
//! let err = StoreError::from_server_message("etcdserver: permission denied");
//! assert!(matches!(err, StoreError::PermissionDenied { .. }));
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::types::LeaseId;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Server message for a request without a user name.
pub const MSG_USER_NAME_EMPTY: &str = "etcdserver: user name is empty";

/// Server message for a request the user is not authorized to make.
pub const MSG_PERMISSION_DENIED: &str = "etcdserver: permission denied";

/// Server message for an unknown lease.
pub const MSG_LEASE_NOT_FOUND: &str = "etcdserver: requested lease not found";

/// Errors produced at the store client boundary.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not identify the caller.
    #[error("{message}")]
    Unauthenticated {
        /// Message reported by the store.
        message: String,
    },

    /// The caller is not allowed to perform the request.
    #[error("{message}")]
    PermissionDenied {
        /// Message reported by the store.
        message: String,
    },

    /// Any other failure reported by the store, preserved verbatim.
    #[error("{message}")]
    Server {
        /// Message reported by the store.
        message: String,
    },

    /// The lease does not exist or has already expired.
    #[error("{MSG_LEASE_NOT_FOUND}")]
    LeaseNotFound {
        /// The lease that was referenced.
        id: LeaseId,
    },

    /// A write gate refused the call before it reached the store.
    #[error("{reason}")]
    WriteDenied {
        /// Why the write was refused.
        reason: String,
    },

    /// Connection or transport failure.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Encoding or decoding failure.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// The client timeout elapsed.
    #[error("Operation timeout")]
    Timeout,
}

impl StoreError {
    /// Maps a raw server error message onto a typed variant.
    ///
    /// Gateways that surface store failures as plain strings call this once
    /// at the boundary; everything downstream matches on the variant.
    #[must_use]
    pub fn from_server_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match message.as_str() {
            MSG_USER_NAME_EMPTY => Self::Unauthenticated { message },
            MSG_PERMISSION_DENIED => Self::PermissionDenied { message },
            MSG_LEASE_NOT_FOUND => Self::LeaseNotFound { id: 0 },
            _ => Self::Server { message },
        }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Server` error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server { message: message.into() }
    }

    /// Creates a new `WriteDenied` error.
    #[must_use]
    pub fn write_denied(reason: impl Into<String>) -> Self {
        Self::WriteDenied { reason: reason.into() }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Returns `true` for failures that may succeed on a fresh connection.
    ///
    /// The compatibility layer never retries on its own; this is exposed
    /// for callers that implement their own policy.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::user_name_empty(MSG_USER_NAME_EMPTY, "unauthenticated")]
    #[case::permission_denied(MSG_PERMISSION_DENIED, "permission_denied")]
    #[case::lease_not_found(MSG_LEASE_NOT_FOUND, "lease_not_found")]
    #[case::message_too_large("grpc: received message larger than max", "server")]
    #[case::empty("", "server")]
    fn server_messages_map_to_variants(#[case] message: &str, #[case] expected: &str) {
        let kind = match StoreError::from_server_message(message) {
            StoreError::Unauthenticated { .. } => "unauthenticated",
            StoreError::PermissionDenied { .. } => "permission_denied",
            StoreError::LeaseNotFound { .. } => "lease_not_found",
            StoreError::Server { .. } => "server",
            other => panic!("unexpected variant: {other:?}"),
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn server_error_display_is_verbatim() {
        let err = StoreError::server("grpc: received message larger than max");
        assert_eq!(err.to_string(), "grpc: received message larger than max");
    }

    #[test]
    fn write_denied_displays_reason() {
        let err = StoreError::write_denied("failed to read config");
        assert_eq!(err.to_string(), "failed to read config");
    }

    #[test]
    fn connection_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StoreError::connection_with_source("dial 127.0.0.1:2379", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_transient());
    }

    #[test]
    fn non_transient_errors() {
        assert!(!StoreError::server("x").is_transient());
        assert!(!StoreError::LeaseNotFound { id: 7 }.is_transient());
    }
}
