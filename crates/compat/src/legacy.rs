//! Legacy (v2-style) response shapes.
//!
//! Every entry point returns a [`LegacyResponse`]: an `X-Etcd-Index` header
//! carrying the store revision, an HTTP-like status, and a body holding a
//! [`Node`] tree. Watchers receive [`LegacyWatchEvent`]s instead.
//!
//! # Example
//!
//! ```
//! use etcd_compat::legacy::{LegacyResponse, STATUS_NOT_FOUND};
//!
//! let res = LegacyResponse::not_found(12);
//! assert_eq!(res.status, STATUS_NOT_FOUND);
//! let json = serde_json::to_value(&res).unwrap();
//! assert_eq!(json["headers"]["X-Etcd-Index"], 12);
//! assert_eq!(json["body"]["message"], "Key not found");
//! ```

use etcd_compat_store::{KeyValue, LeaseId, Revision};
use serde::Serialize;
use serde_json::Value;

/// Request succeeded.
pub const STATUS_OK: u16 = 200;

/// A key was written for the first time.
pub const STATUS_CREATED: u16 = 201;

/// The key does not exist.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Body message of a 404.
pub const MSG_KEY_NOT_FOUND: &str = "Key not found";

/// Status reason of a 404.
pub const REASON_NOT_FOUND: &str = "Not found";

/// Response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LegacyHeaders {
    /// Store revision the response was produced at.
    #[serde(rename = "X-Etcd-Index")]
    pub etcd_index: Revision,
}

/// What a response or watch event reports was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Read.
    Get,
    /// Unconditional write.
    Set,
    /// Write of a freshly generated key.
    Create,
    /// Guarded write.
    CompareAndSwap,
    /// Delete.
    Delete,
}

/// A key or directory in the legacy tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Full key, including the configured prefix.
    pub key: String,
    /// Decoded JSON value; absent for directories and undecodable values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Revision the key was created at.
    pub created_index: Revision,
    /// Revision the key was last modified at.
    pub modified_index: Revision,
    /// Whether this node is a directory.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dir: bool,
    /// Children of a directory, in key order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
}

impl Node {
    /// Projects a store entry.
    #[must_use]
    pub fn from_kv(kv: &KeyValue) -> Self {
        Self {
            key: kv.key_str().into_owned(),
            value: decode_value(&kv.value),
            created_index: kv.create_revision,
            modified_index: kv.mod_revision,
            dir: false,
            nodes: None,
        }
    }
}

/// Decodes a stored value.
///
/// Returns `None` for empty or non-JSON bytes; such entries are treated as
/// directory markers.
#[must_use]
pub fn decode_value(raw: &[u8]) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    serde_json::from_slice(raw).ok()
}

/// Response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegacyBody {
    /// The node read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    /// What was done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Human-readable outcome, set on 404s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full key affected by a delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Lease attached to a write, or renewed by a keepalive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<LeaseId>,
    /// Remaining lease TTL in seconds after a keepalive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// A translated response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyResponse {
    /// Headers.
    pub headers: LegacyHeaders,
    /// HTTP-like status.
    pub status: u16,
    /// Status reason, set on 404s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Body.
    pub body: LegacyBody,
}

impl LegacyResponse {
    /// A response with `status` and `body` at `revision`.
    #[must_use]
    pub fn new(revision: Revision, status: u16, body: LegacyBody) -> Self {
        Self { headers: LegacyHeaders { etcd_index: revision }, status, reason: None, body }
    }

    /// The 404 response.
    #[must_use]
    pub fn not_found(revision: Revision) -> Self {
        Self {
            headers: LegacyHeaders { etcd_index: revision },
            status: STATUS_NOT_FOUND,
            reason: Some(REASON_NOT_FOUND.to_owned()),
            body: LegacyBody { message: Some(MSG_KEY_NOT_FOUND.to_owned()), ..LegacyBody::default() },
        }
    }

    /// Returns `true` for a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }

    /// Returns the node, if any.
    #[must_use]
    pub fn node(&self) -> Option<&Node> {
        self.body.node.as_ref()
    }
}

/// Body of a watch event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyWatchBody {
    /// One node per change, in revision order.
    pub node: Vec<Node>,
    /// [`Action::Delete`] if any change in the batch was a delete.
    pub action: Action,
}

/// A translated watch batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyWatchEvent {
    /// Headers.
    pub headers: LegacyHeaders,
    /// Body.
    pub body: LegacyWatchBody,
}
