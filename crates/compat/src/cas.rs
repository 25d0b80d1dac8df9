//! Optimistic compare-and-swap.

use std::time::Duration;

use bytes::Bytes;
use etcd_compat_store::{Compare, CompareResult, PutOptions, Revision, TxnOp, TxnRequest};
use serde_json::Value;

use crate::{
    adapter::{EtcdAdapter, encode_value, grant_lease},
    error::Result,
    legacy::LegacyResponse,
    translate::format_compare_and_swap,
};

impl EtcdAdapter {
    /// Writes `value` under `key` only if the key's modification revision
    /// is still `mod_revision`.
    ///
    /// A non-zero `ttl` attaches the value to a fresh lease, granted before
    /// the guard is evaluated and revoked again if the guard fails.
    ///
    /// # Errors
    ///
    /// Returns [`CompatError::ValueChanged`](crate::CompatError::ValueChanged)
    /// if the key was modified since `mod_revision`; the stored value is left
    /// untouched. Never retried.
    #[tracing::instrument(skip(self, value))]
    pub async fn atomic_set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
        mod_revision: Revision,
    ) -> Result<LegacyResponse> {
        let handle = self.manager.handle().await?;
        let full_key = handle.full_key(key);
        let encoded = encode_value(value)?;

        let lease_id = grant_lease(&handle, ttl).await?;
        let mut options = PutOptions::default();
        if let Some(id) = lease_id {
            options = options.with_lease(id);
        }

        let request = TxnRequest {
            compare: vec![Compare::mod_revision(
                full_key.clone(),
                CompareResult::Equal,
                mod_revision,
            )],
            success: vec![TxnOp::Put {
                key: Bytes::from(full_key.clone()),
                value: Bytes::from(encoded),
                options,
            }],
            failure: Vec::new(),
        };

        let response = handle.client().txn(request).await?;
        if !response.succeeded
            && let Some(id) = lease_id
            && let Err(err) = handle.client().revoke(id).await
        {
            tracing::warn!(lease = id, error = %err, "failed to revoke lease after lost compare-and-swap");
        }
        format_compare_and_swap(response, full_key, value.clone())
    }
}
