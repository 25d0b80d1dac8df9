//! Native (v3-style) request and response shapes.
//!
//! These types mirror the subset of the etcd v3 API consumed by the
//! compatibility layer: range reads, puts, deletes, leases, single-level
//! transactions, watch batches and version info. Keys and values are raw
//! bytes; revisions are the store's global 64-bit mutation counter.

use std::borrow::Cow;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The store's global mutation counter.
pub type Revision = i64;

/// Opaque lease identifier returned by a lease grant.
pub type LeaseId = i64;

/// Header attached to every store response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Cluster the responding member belongs to.
    pub cluster_id: u64,
    /// Member that served the request.
    pub member_id: u64,
    /// Store revision at the time the request was served.
    pub revision: Revision,
    /// Raft term of the responding member.
    pub raft_term: u64,
}

/// A stored key-value entry as of the time it was read.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use etcd_compat_store::KeyValue;
///
/// let kv = KeyValue::new(Bytes::from("/routes/1"), Bytes::from(r#"{"uri":"/a"}"#));
/// assert_eq!(kv.key_str(), "/routes/1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,
    /// The value. Empty for delete events.
    pub value: Bytes,
    /// Revision at which the key was created.
    pub create_revision: Revision,
    /// Revision of the last modification.
    pub mod_revision: Revision,
    /// Number of modifications since creation.
    pub version: i64,
    /// Attached lease, `0` when none.
    pub lease: LeaseId,
}

impl KeyValue {
    /// Creates an entry with zeroed revision metadata.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value, ..Self::default() }
    }

    /// Returns the key as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// Response to a range read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Matching entries in ascending key order.
    pub kvs: Vec<KeyValue>,
    /// Whether more entries exist beyond the returned ones.
    pub more: bool,
    /// Total number of matching keys.
    pub count: i64,
}

/// Options for a put.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    /// Return the previous entry, if any.
    pub prev_kv: bool,
    /// Attach the key to this lease.
    pub lease: Option<LeaseId>,
}

impl PutOptions {
    /// Requests the previous entry in the response.
    #[must_use]
    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }

    /// Attaches the key to a lease.
    #[must_use]
    pub fn with_lease(mut self, lease: LeaseId) -> Self {
        self.lease = Some(lease);
        self
    }
}

/// Response to a put.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// The overwritten entry, when requested and present.
    pub prev_kv: Option<KeyValue>,
}

/// Response to a delete or prefix delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Number of keys removed.
    pub deleted: i64,
    /// Removed entries.
    pub prev_kvs: Vec<KeyValue>,
}

/// Response to a lease grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseGrantResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Assigned lease id.
    pub id: LeaseId,
    /// Granted TTL in seconds.
    pub ttl: i64,
}

/// Response to a lease revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRevokeResponse {
    /// Response header.
    pub header: ResponseHeader,
}

/// Response to a lease keepalive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseKeepAliveResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Renewed lease id.
    pub id: LeaseId,
    /// TTL the lease was renewed for, in seconds.
    pub ttl: i64,
}

/// Comparison operator in a transaction guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareResult {
    /// Equal.
    Equal,
    /// Greater than.
    Greater,
    /// Less than.
    Less,
    /// Not equal.
    NotEqual,
}

/// The attribute a compare inspects, with the operand to compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareTarget {
    /// Modification count.
    Version(i64),
    /// Creation revision.
    Create(Revision),
    /// Last modification revision.
    Mod(Revision),
    /// Stored value bytes.
    Value(Bytes),
    /// Attached lease.
    Lease(LeaseId),
}

/// A single transaction guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compare {
    /// Key under comparison.
    pub key: Bytes,
    /// Operator.
    pub result: CompareResult,
    /// Attribute and operand.
    pub target: CompareTarget,
}

impl Compare {
    /// Guards on the key's modification revision.
    pub fn mod_revision(key: impl Into<Bytes>, result: CompareResult, revision: Revision) -> Self {
        Self { key: key.into(), result, target: CompareTarget::Mod(revision) }
    }

    /// Guards on the key's creation revision.
    pub fn create_revision(
        key: impl Into<Bytes>,
        result: CompareResult,
        revision: Revision,
    ) -> Self {
        Self { key: key.into(), result, target: CompareTarget::Create(revision) }
    }
}

/// Operation executed by a transaction branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnOp {
    /// Exact-key read.
    Range {
        /// Key to read.
        key: Bytes,
    },
    /// Write.
    Put {
        /// Key to write.
        key: Bytes,
        /// Value to write.
        value: Bytes,
        /// Put options.
        options: PutOptions,
    },
    /// Exact-key delete.
    Delete {
        /// Key to delete.
        key: Bytes,
    },
}

impl TxnOp {
    /// Returns `true` for operations that may change the store.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Range { .. })
    }
}

/// Per-operation result of an executed transaction branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnOpResponse {
    /// Read result.
    Range(RangeResponse),
    /// Write result.
    Put(PutResponse),
    /// Delete result.
    Delete(DeleteResponse),
}

/// A guarded transaction: all compares must hold for `success` to run,
/// otherwise `failure` runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRequest {
    /// Guards.
    pub compare: Vec<Compare>,
    /// Operations run when every guard holds.
    pub success: Vec<TxnOp>,
    /// Operations run otherwise.
    pub failure: Vec<TxnOp>,
}

/// Result of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Whether every guard held.
    pub succeeded: bool,
    /// Results of the executed branch.
    pub responses: Vec<TxnOpResponse>,
}

/// Kind of change reported by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Key written.
    Put,
    /// Key removed.
    Delete,
}

/// One change observed by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Kind of change.
    pub event_type: EventType,
    /// Entry after the change. For deletes only key and `mod_revision` are set.
    pub kv: KeyValue,
    /// Entry before the change, if it existed.
    pub prev_kv: Option<KeyValue>,
}

/// A batch of changes delivered to a watcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchResponse {
    /// Response header.
    pub header: ResponseHeader,
    /// Changes in revision order.
    pub events: Vec<Event>,
    /// Non-zero when the requested start revision has been compacted away.
    pub compact_revision: Revision,
    /// Whether the store cancelled the watch.
    pub canceled: bool,
}

/// Parameters of a watch subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRequest {
    /// Watched key, or prefix when `prefix` is set.
    pub key: Bytes,
    /// Watch every key under `key`.
    pub prefix: bool,
    /// First revision to deliver. `0` starts from the next change.
    pub start_revision: Revision,
}

impl WatchRequest {
    /// Watches every key under `prefix` starting at `start_revision`.
    pub fn prefix(prefix: impl Into<Bytes>, start_revision: Revision) -> Self {
        Self { key: prefix.into(), prefix: true, start_revision }
    }

    /// Returns `true` if `key` falls within this subscription.
    #[must_use]
    pub fn matches(&self, key: &[u8]) -> bool {
        if self.prefix { key.starts_with(&self.key) } else { key == self.key.as_ref() }
    }
}

/// Version strings reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version of the serving member.
    #[serde(rename = "etcdserver")]
    pub server: String,
    /// Version of the cluster.
    #[serde(rename = "etcdcluster")]
    pub cluster: String,
}

/// Returns the exclusive upper bound of the key range covered by `prefix`.
///
/// Returns `None` when the prefix has no upper bound (empty or all `0xff`).
///
/// # Examples
///
/// ```
/// use etcd_compat_store::types::prefix_range_end;
///
/// assert_eq!(prefix_range_end(b"/routes/"), Some(b"/routes0".to_vec()));
/// assert_eq!(prefix_range_end(b""), None);
/// ```
#[must_use]
pub fn prefix_range_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
