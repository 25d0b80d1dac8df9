//! Write-gated store client.
//!
//! [`GatedStoreOperations`] wraps a [`StoreClient`] so that every mutating
//! operation is authorized by a [`WriteGate`] before it reaches the store.
//! It is itself a [`StoreClient`], so callers cannot tell the difference
//! until a write is refused.
//!
//! ```text
//! caller ──► GatedStoreOperations ──► WriteGate ──denied──► StoreError::WriteDenied
//!                     │                   │
//!                     │                allowed
//!                     ▼                   ▼
//!               reads / txn ──────► inner StoreClient
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use etcd_compat_store::{
    DeleteResponse, LeaseGrantResponse, LeaseId, LeaseKeepAliveResponse, LeaseRevokeResponse,
    MutatingOperation, MutatingStoreOperations, PutOptions, PutResponse, RangeResponse,
    ReadOperations, StoreClient, StoreError, StoreResult, TxnRequest, TxnResponse, VersionInfo,
    WatchRequest, WatchStream,
};

use crate::{
    error::{CompatError, Result},
    gate::WriteGate,
};

/// A [`StoreClient`] whose mutating operations pass through a [`WriteGate`].
#[derive(Clone)]
pub struct GatedStoreOperations {
    inner: Arc<dyn StoreClient>,
    gate: WriteGate,
}

impl GatedStoreOperations {
    /// Wraps `inner`.
    ///
    /// # Errors
    ///
    /// Returns [`CompatError::MissingOperation`] naming the first mutating
    /// operation `inner` does not support.
    pub fn new(inner: Arc<dyn StoreClient>, gate: WriteGate) -> Result<Self> {
        let supported = inner.supported_operations();
        if let Some(method) = MutatingOperation::ALL.into_iter().find(|op| !supported.contains(op))
        {
            return Err(CompatError::MissingOperation { method });
        }
        Ok(Self { inner, gate })
    }

    /// Returns the wrapped client.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn StoreClient> {
        &self.inner
    }

    fn authorize(&self, operation: MutatingOperation) -> StoreResult<()> {
        let decision = self.gate.authorize_write();
        if decision.denied {
            tracing::debug!(%operation, "write denied by gate");
            return Err(StoreError::write_denied(decision.reason.unwrap_or_default()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for GatedStoreOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedStoreOperations")
            .field("unix_socket_proxy", &self.inner.unix_socket_proxy())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReadOperations for GatedStoreOperations {
    async fn range(&self, key: &[u8]) -> StoreResult<RangeResponse> {
        self.inner.range(key).await
    }

    async fn range_prefix(&self, prefix: &[u8]) -> StoreResult<RangeResponse> {
        self.inner.range_prefix(prefix).await
    }

    async fn txn(&self, request: TxnRequest) -> StoreResult<TxnResponse> {
        self.inner.txn(request).await
    }

    async fn watch(&self, request: WatchRequest) -> StoreResult<WatchStream> {
        self.inner.watch(request).await
    }

    async fn version(&self) -> StoreResult<VersionInfo> {
        self.inner.version().await
    }
}

#[async_trait]
impl MutatingStoreOperations for GatedStoreOperations {
    fn supported_operations(&self) -> &[MutatingOperation] {
        self.inner.supported_operations()
    }

    async fn set(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<PutResponse> {
        self.authorize(MutatingOperation::Set)?;
        self.inner.set(key, value, options).await
    }

    async fn setnx(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<TxnResponse> {
        self.authorize(MutatingOperation::Setnx)?;
        self.inner.setnx(key, value, options).await
    }

    async fn setx(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<TxnResponse> {
        self.authorize(MutatingOperation::Setx)?;
        self.inner.setx(key, value, options).await
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<DeleteResponse> {
        self.authorize(MutatingOperation::Delete)?;
        self.inner.delete(key).await
    }

    async fn rmdir(&self, prefix: &[u8]) -> StoreResult<DeleteResponse> {
        self.authorize(MutatingOperation::Rmdir)?;
        self.inner.rmdir(prefix).await
    }

    async fn grant(&self, ttl: i64) -> StoreResult<LeaseGrantResponse> {
        self.authorize(MutatingOperation::Grant)?;
        self.inner.grant(ttl).await
    }

    async fn revoke(&self, id: LeaseId) -> StoreResult<LeaseRevokeResponse> {
        self.authorize(MutatingOperation::Revoke)?;
        self.inner.revoke(id).await
    }

    async fn keepalive(&self, id: LeaseId) -> StoreResult<LeaseKeepAliveResponse> {
        self.authorize(MutatingOperation::Keepalive)?;
        self.inner.keepalive(id).await
    }
}

#[async_trait]
impl StoreClient for GatedStoreOperations {
    fn unix_socket_proxy(&self) -> Option<&str> {
        self.inner.unix_socket_proxy()
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
