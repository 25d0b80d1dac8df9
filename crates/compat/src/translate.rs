//! Native-to-legacy response translation.
//!
//! Reads are the interesting case. A directory read is a prefix range whose
//! first entry stands in for the directory itself:
//!
//! - if that entry is a marker (no decodable value), the directory key is
//!   its key with one trailing `/` removed, and the remaining entries are the
//!   children;
//! - otherwise the directory key is everything before the entry's last `/`,
//!   and every entry, the first included, is a child.
//!
//! Writes build their node from the request rather than from the store's
//! reply; the previous value is never returned.

use etcd_compat_store::{
    DeleteResponse, EventType, LeaseId, LeaseKeepAliveResponse, PutResponse, RangeResponse,
    StoreResult, TxnResponse, WatchResponse,
};
use serde_json::Value;

use crate::{
    error::{CompatError, Result},
    legacy::{
        Action, LegacyBody, LegacyHeaders, LegacyResponse, LegacyWatchBody, LegacyWatchEvent,
        Node, STATUS_CREATED, STATUS_OK,
    },
};

/// Translates a prefix range read of `real_key`.
///
/// # Errors
///
/// Returns the store error, with authentication failures mapped to their
/// fixed-code legacy errors.
pub fn format_read(
    response: StoreResult<RangeResponse>,
    real_key: &str,
    is_dir: bool,
) -> Result<LegacyResponse> {
    let response = response?;
    let revision = response.header.revision;

    let Some(first) = response.kvs.first() else {
        return Ok(LegacyResponse::not_found(revision));
    };

    let node = if is_dir {
        directory_node(&response)
    } else {
        if first.key.as_ref() != real_key.as_bytes() {
            return Ok(LegacyResponse::not_found(revision));
        }
        Node::from_kv(first)
    };

    Ok(LegacyResponse::new(
        revision,
        STATUS_OK,
        LegacyBody { node: Some(node), action: Some(Action::Get), ..LegacyBody::default() },
    ))
}

fn directory_node(response: &RangeResponse) -> Node {
    let mut entries = response.kvs.iter();
    let mut dir = entries.next().map(Node::from_kv).unwrap_or_default();

    let children: Vec<Node> = if dir.value.is_none() {
        if dir.key.ends_with('/') {
            dir.key.pop();
        }
        entries.map(Node::from_kv).collect()
    } else {
        if let Some(end) = dir.key.rfind('/') {
            dir.key.truncate(end);
        }
        response.kvs.iter().map(Node::from_kv).collect()
    };

    dir.value = None;
    dir.dir = true;
    dir.nodes = Some(children);
    dir
}

/// Translates a put of `value` under `full_key`.
///
/// The response is 201 for a fresh key and 200 when a previous value was
/// overwritten; `response` must have been requested with `prev_kv`.
#[must_use]
pub fn format_set(
    response: PutResponse,
    full_key: String,
    value: Value,
    lease_id: Option<LeaseId>,
) -> LegacyResponse {
    let revision = response.header.revision;
    let (status, created_index) = match &response.prev_kv {
        Some(prev) => (STATUS_OK, prev.create_revision),
        None => (STATUS_CREATED, revision),
    };

    let node = Node {
        key: full_key,
        value: Some(value),
        created_index,
        modified_index: revision,
        ..Node::default()
    };
    LegacyResponse::new(
        revision,
        status,
        LegacyBody { node: Some(node), action: Some(Action::Set), lease_id, ..LegacyBody::default() },
    )
}

/// Translates a guarded put of `value` under `full_key`.
///
/// # Errors
///
/// Returns [`CompatError::ValueChanged`] if the guard failed.
pub fn format_compare_and_swap(
    response: TxnResponse,
    full_key: String,
    value: Value,
) -> Result<LegacyResponse> {
    if !response.succeeded {
        return Err(CompatError::ValueChanged);
    }

    let revision = response.header.revision;
    let node =
        Node { key: full_key, value: Some(value), modified_index: revision, ..Node::default() };
    Ok(LegacyResponse::new(
        revision,
        STATUS_OK,
        LegacyBody { node: Some(node), action: Some(Action::CompareAndSwap), ..LegacyBody::default() },
    ))
}

/// Translates a delete of `full_key`; 404 when nothing was deleted.
#[must_use]
pub fn format_delete(response: DeleteResponse, full_key: String) -> LegacyResponse {
    let revision = response.header.revision;
    if response.deleted == 0 {
        return LegacyResponse::not_found(revision);
    }
    LegacyResponse::new(
        revision,
        STATUS_OK,
        LegacyBody { action: Some(Action::Delete), key: Some(full_key), ..LegacyBody::default() },
    )
}

/// Translates a lease renewal.
#[must_use]
pub fn format_keepalive(response: LeaseKeepAliveResponse) -> LegacyResponse {
    LegacyResponse::new(
        response.header.revision,
        STATUS_OK,
        LegacyBody {
            lease_id: Some(response.id),
            ttl: Some(response.ttl),
            ..LegacyBody::default()
        },
    )
}

/// Translates one watch batch.
///
/// The action is [`Action::Delete`] if any event in the batch is a delete,
/// regardless of order.
///
/// # Errors
///
/// Returns [`CompatError::Compacted`] when the store reports compaction;
/// the batch's events are not inspected.
pub fn format_watch(response: WatchResponse) -> Result<LegacyWatchEvent> {
    if response.compact_revision > 0 {
        return Err(CompatError::Compacted { compact_revision: response.compact_revision });
    }

    let mut action = Action::Set;
    let mut nodes = Vec::with_capacity(response.events.len());
    for event in &response.events {
        if event.event_type == EventType::Delete {
            action = Action::Delete;
        }
        nodes.push(Node::from_kv(&event.kv));
    }

    Ok(LegacyWatchEvent {
        headers: LegacyHeaders { etcd_index: response.header.revision },
        body: LegacyWatchBody { node: nodes, action },
    })
}
