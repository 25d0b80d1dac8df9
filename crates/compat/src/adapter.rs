//! Legacy entry points.
//!
//! [`EtcdAdapter`] is what application code calls. Each operation asks the
//! [`ClientLifecycleManager`] for a live handle, prefixes the key, runs the
//! store call (mutations pass through the write gate inside the handle), and
//! translates the result into the legacy shape.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use etcd_compat::{ClientLifecycleManager, EtcdAdapter};
//! use serde_json::json;
//!
//! # async fn run(manager: Arc<ClientLifecycleManager>) -> etcd_compat::Result<()> {
//! let adapter = EtcdAdapter::new(manager);
//! let res = adapter.set("/routes/1", &json!({"uri": "/a"}), None).await?;
//! assert_eq!(res.status, 201);
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use etcd_compat_store::{
    LeaseId, PutOptions, Revision, VersionInfo, WatchRequest, WatchStream,
};
use serde_json::Value;

use crate::{
    error::{CompatError, Result},
    factory::ClientHandle,
    legacy::{LegacyResponse, LegacyWatchEvent},
    lifecycle::ClientLifecycleManager,
    translate::{format_delete, format_keepalive, format_read, format_set, format_watch},
};

/// Legacy get/set/delete surface over the managed store client.
#[derive(Debug, Clone)]
pub struct EtcdAdapter {
    pub(crate) manager: Arc<ClientLifecycleManager>,
}

impl EtcdAdapter {
    /// Creates an adapter drawing clients from `manager`.
    #[must_use]
    pub fn new(manager: Arc<ClientLifecycleManager>) -> Self {
        Self { manager }
    }

    /// Returns the lifecycle manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<ClientLifecycleManager> {
        &self.manager
    }

    /// Reads `key`, or the directory rooted at it when `is_dir` is set.
    ///
    /// # Errors
    ///
    /// Returns [`CompatError::InsufficientCredentials`] or
    /// [`CompatError::Forbidden`] for authentication failures, and any other
    /// store or construction error unchanged. A missing key is a 404
    /// response, not an error.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str, is_dir: bool) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let real_key = handle.full_key(key);
        let response = handle.client().range_prefix(real_key.as_bytes()).await;
        format_read(response, &real_key, is_dir)
    }

    /// Writes `value` under `key`, attached to a fresh lease when `ttl` is
    /// set and non-zero.
    ///
    /// # Errors
    ///
    /// Returns the write gate's denial, authentication failures, or any
    /// other store error.
    #[tracing::instrument(skip(self, value))]
    pub async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let full_key = handle.full_key(key);
        let encoded = encode_value(value)?;

        let lease_id = grant_lease(&handle, ttl).await?;
        let mut options = PutOptions::default().with_prev_kv();
        if let Some(id) = lease_id {
            options = options.with_lease(id);
        }

        let response = handle.client().set(full_key.as_bytes(), encoded, options).await?;
        Ok(format_set(response, full_key, value.clone(), lease_id))
    }

    /// Deletes `key`.
    ///
    /// # Errors
    ///
    /// Returns the write gate's denial or any store error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let full_key = handle.full_key(key);
        let response = handle.client().delete(full_key.as_bytes()).await?;
        Ok(format_delete(response, full_key))
    }

    /// Deletes `key` and every key beneath it.
    ///
    /// # Errors
    ///
    /// Returns the write gate's denial or any store error.
    #[tracing::instrument(skip(self))]
    pub async fn rmdir(&self, key: &str) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let full_key = handle.full_key(key);
        let response = handle.client().rmdir(full_key.as_bytes()).await?;
        Ok(format_delete(response, full_key))
    }

    /// Renews lease `id`.
    ///
    /// # Errors
    ///
    /// Returns the write gate's denial, or
    /// [`StoreError::LeaseNotFound`](etcd_compat_store::StoreError::LeaseNotFound)
    /// if the lease has expired.
    #[tracing::instrument(skip(self))]
    pub async fn keepalive(&self, id: LeaseId) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let response = handle.client().keepalive(id).await?;
        Ok(format_keepalive(response))
    }

    /// Reports the store's server and cluster versions.
    ///
    /// # Errors
    ///
    /// Returns any store or construction error.
    pub async fn server_version(&self) -> Result<VersionInfo> {
        let handle = self.manager.handle().await?;
        Ok(handle.client().version().await?)
    }

    /// Watches `key` and everything beneath it from `start_revision`
    /// (`0` for changes after now) on a dedicated client.
    ///
    /// # Errors
    ///
    /// Returns any store or construction error.
    #[tracing::instrument(skip(self))]
    pub async fn watch(&self, key: &str, start_revision: Revision) -> Result<LegacyWatchStream> {
        let handle = self.manager.dedicated_handle(None).await?;
        let request = WatchRequest::prefix(handle.full_key(key), start_revision);
        match handle.client().watch(request).await {
            Ok(stream) => Ok(LegacyWatchStream { stream, handle }),
            Err(err) => {
                handle.client().close().await;
                Err(err.into())
            },
        }
    }
}

/// Translated watch batches on a dedicated client.
#[derive(Debug)]
pub struct LegacyWatchStream {
    stream: WatchStream,
    handle: ClientHandle,
}

impl LegacyWatchStream {
    /// Waits for the next batch. Returns `None` once the watch has ended.
    ///
    /// A compacted start revision yields one
    /// [`CompatError::Compacted`] and then the end of the stream.
    pub async fn next(&mut self) -> Option<Result<LegacyWatchEvent>> {
        self.stream.next().await.map(format_watch)
    }

    /// Closes the dedicated client.
    pub async fn close(self) {
        self.handle.client().close().await;
    }
}

pub(crate) fn encode_value(value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CompatError::invalid_value(e.to_string()))
}

/// Grants a lease for `ttl`, rounded up to whole seconds. No lease for a
/// missing or zero TTL. TTLs beyond `i64::MAX` seconds saturate and are left
/// for the store to reject.
pub(crate) async fn grant_lease(
    handle: &ClientHandle,
    ttl: Option<Duration>,
) -> Result<Option<LeaseId>> {
    let Some(ttl) = ttl.filter(|ttl| !ttl.is_zero()) else {
        return Ok(None);
    };
    let seconds = ttl.as_secs().saturating_add(u64::from(ttl.subsec_nanos() > 0));
    let lease = handle.client().grant(i64::try_from(seconds).unwrap_or(i64::MAX)).await?;
    Ok(Some(lease.id))
}
