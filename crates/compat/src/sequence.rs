//! Sequential identifiers derived from the store revision.
//!
//! The store has no counter primitive, so [`EtcdAdapter::push`] advances the
//! global revision with a throwaway write to [`GC_KEY`] and uses the
//! revision that write was committed at. Every mutation gets its own
//! revision, so two pushes can never observe the same one.

use std::time::Duration;

use etcd_compat_store::Revision;
use serde_json::Value;

use crate::{
    adapter::EtcdAdapter,
    error::{CompatError, Result},
    legacy::{Action, LegacyResponse},
};

/// Key written to advance the revision, relative to the prefix.
pub const GC_KEY: &str = "/gc";

/// Width of a generated identifier.
pub const SEQUENCE_ID_WIDTH: usize = 20;

/// Formats `revision` as a fixed-width identifier.
///
/// # Examples
///
/// ```
/// use etcd_compat::sequence::sequence_id;
///
/// assert_eq!(sequence_id(42), "00000000000000000042");
/// ```
#[must_use]
pub fn sequence_id(revision: Revision) -> String {
    format!("{revision:0width$}", width = SEQUENCE_ID_WIDTH)
}

impl EtcdAdapter {
    /// Stores `value` under a new key `key/<id>`, where `<id>` is a fresh
    /// sequential identifier also written into the value's `id` field.
    ///
    /// # Errors
    ///
    /// Returns [`CompatError::InvalidValue`] if `value` is not a JSON
    /// object, and any error from the two underlying writes.
    #[tracing::instrument(skip(self, value))]
    pub async fn push(
        &self,
        key: &str,
        mut value: Value,
        ttl: Option<Duration>,
    ) -> Result<LegacyResponse> {
        let Value::Object(fields) = &mut value else {
            return Err(CompatError::invalid_value("pushed value must be a JSON object"));
        };

        let bump = self.set(GC_KEY, &Value::Bool(true), None).await?;
        let id = sequence_id(bump.headers.etcd_index);
        fields.insert("id".to_owned(), Value::String(id.clone()));

        let mut response = self.set(&format!("{key}/{id}"), &value, ttl).await?;
        response.body.action = Some(Action::Create);
        Ok(response)
    }
}
