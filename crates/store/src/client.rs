//! Store client traits.
//!
//! The store surface is split by capability:
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`ReadOperations`] | `range`, `range_prefix`, `txn`, `watch`, `version` |
//! | [`MutatingStoreOperations`] | `set`, `setnx`, `setx`, `delete`, `rmdir`, `grant`, `revoke`, `keepalive` |
//! | [`StoreClient`] | both, plus proxy routing and `close` |
//!
//! Splitting mutations into their own trait lets decorators (such as a write
//! gate) intercept exactly the mutating calls by composition. `txn` lives on
//! the read side: it can both read and write, and the interception is keyed
//! on the declared operation, not on what a transaction happens to contain.
//!
//! [`StoreConnector`] builds clients from a [`ClientConfig`].

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    config::ClientConfig,
    error::StoreResult,
    types::{
        DeleteResponse, LeaseGrantResponse, LeaseId, LeaseKeepAliveResponse, LeaseRevokeResponse,
        PutOptions, PutResponse, RangeResponse, TxnRequest, TxnResponse, VersionInfo,
        WatchRequest,
    },
    watch::WatchStream,
};

/// Names of the mutating operations a client must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutatingOperation {
    /// Unconditional put.
    Set,
    /// Put if absent.
    Setnx,
    /// Put if present.
    Setx,
    /// Exact-key delete.
    Delete,
    /// Prefix delete.
    Rmdir,
    /// Lease grant.
    Grant,
    /// Lease revoke.
    Revoke,
    /// Lease renewal.
    Keepalive,
}

impl MutatingOperation {
    /// Every mutating operation, in declaration order.
    pub const ALL: [MutatingOperation; 8] = [
        Self::Set,
        Self::Setnx,
        Self::Setx,
        Self::Delete,
        Self::Rmdir,
        Self::Grant,
        Self::Revoke,
        Self::Keepalive,
    ];

    /// Returns the operation's method name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Setnx => "setnx",
            Self::Setx => "setx",
            Self::Delete => "delete",
            Self::Rmdir => "rmdir",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
            Self::Keepalive => "keepalive",
        }
    }
}

impl fmt::Display for MutatingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-side store operations.
#[async_trait]
pub trait ReadOperations: Send + Sync {
    /// Reads a single key.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn range(&self, key: &[u8]) -> StoreResult<RangeResponse>;

    /// Reads `prefix` and every key that starts with it, in ascending key order.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn range_prefix(&self, prefix: &[u8]) -> StoreResult<RangeResponse>;

    /// Executes a guarded transaction atomically.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn txn(&self, request: TxnRequest) -> StoreResult<TxnResponse>;

    /// Opens a watch subscription.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn watch(&self, request: WatchRequest) -> StoreResult<WatchStream>;

    /// Reports server and cluster versions.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn version(&self) -> StoreResult<VersionInfo>;
}

/// Mutating store operations.
#[async_trait]
pub trait MutatingStoreOperations: Send + Sync {
    /// Operations this client actually implements.
    ///
    /// Decorators use this to reject incomplete clients at construction
    /// time. Defaults to [`MutatingOperation::ALL`].
    fn supported_operations(&self) -> &[MutatingOperation] {
        &MutatingOperation::ALL
    }

    /// Writes `value` under `key`.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn set(&self, key: &[u8], value: Vec<u8>, options: PutOptions)
    -> StoreResult<PutResponse>;

    /// Writes `value` under `key` only if the key does not exist.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn setnx(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<TxnResponse>;

    /// Writes `value` under `key` only if the key already exists.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn setx(&self, key: &[u8], value: Vec<u8>, options: PutOptions)
    -> StoreResult<TxnResponse>;

    /// Deletes a single key.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn delete(&self, key: &[u8]) -> StoreResult<DeleteResponse>;

    /// Deletes `prefix` and every key that starts with it.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn rmdir(&self, prefix: &[u8]) -> StoreResult<DeleteResponse>;

    /// Grants a lease with the given TTL in seconds.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn grant(&self, ttl: i64) -> StoreResult<LeaseGrantResponse>;

    /// Revokes a lease, deleting every key attached to it.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn revoke(&self, id: LeaseId) -> StoreResult<LeaseRevokeResponse>;

    /// Renews a lease for another full TTL.
    #[must_use = "store operations may fail and errors must be handled"]
    async fn keepalive(&self, id: LeaseId) -> StoreResult<LeaseKeepAliveResponse>;
}

/// A full store client session.
#[async_trait]
pub trait StoreClient: ReadOperations + MutatingStoreOperations {
    /// Local proxy address (`unix:<path>`) this client routes through, if any.
    fn unix_socket_proxy(&self) -> Option<&str>;

    /// Releases the session. Later calls fail with a connection error.
    async fn close(&self);
}

/// Builds store clients.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Constructs a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns the underlying construction failure unchanged.
    async fn connect(&self, config: &ClientConfig) -> StoreResult<Arc<dyn StoreClient>>;
}
