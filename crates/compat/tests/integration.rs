//! Integration tests for the legacy entry points.
//!
//! Every test drives [`EtcdAdapter`] through the real factory, write gate and
//! lifecycle manager against an in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use etcd_compat::{
    Action, CompatError, HandleState,
    config::{ConfigError, DeploymentRole},
    legacy::{STATUS_CREATED, STATUS_OK},
    testutil::{Harness, local_config},
};
use etcd_compat_store::{MutatingStoreOperations, PutOptions, StoreError};
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

async fn serving(prefix: &str) -> Harness {
    Harness::serving(prefix, DeploymentRole::ControlPlane).await
}

/// Writes raw bytes straight into the store, bypassing the adapter.
async fn put_raw(harness: &Harness, key: &str, value: &[u8]) {
    harness
        .store
        .client()
        .set(key.as_bytes(), value.to_vec(), PutOptions::default())
        .await
        .expect("raw put should succeed");
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_get_missing_key_is_404() {
    let harness = serving("/apisix").await;

    let res = harness.adapter.get("/routes/missing", false).await.unwrap();
    assert!(res.is_not_found());
    assert_eq!(res.body.message.as_deref(), Some("Key not found"));
    assert_eq!(res.headers.etcd_index, harness.store.revision());
}

#[tokio::test]
async fn test_set_then_get_returns_value_with_increasing_index() {
    let harness = serving("/apisix").await;

    harness.adapter.set("/routes/1", &json!({"uri": "/a"}), None).await.unwrap();
    let first = harness.adapter.get("/routes/1", false).await.unwrap();
    let first_index = first.node().unwrap().modified_index;

    harness.adapter.set("/routes/1", &json!({"uri": "/b"}), None).await.unwrap();
    let second = harness.adapter.get("/routes/1", false).await.unwrap();
    let node = second.node().unwrap();

    assert_eq!(node.value, Some(json!({"uri": "/b"})));
    assert!(node.modified_index > first_index);
    assert_eq!(node.created_index, first.node().unwrap().created_index);
}

#[tokio::test]
async fn test_get_does_not_match_longer_sibling() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/10", &json!({}), None).await.unwrap();

    let res = harness.adapter.get("/routes/1", false).await.unwrap();
    assert!(res.is_not_found());
}

#[tokio::test]
async fn test_directory_read_with_marker() {
    let harness = serving("/apisix").await;
    put_raw(&harness, "/apisix/routes/", b"init_dir").await;
    for id in ["3", "1", "2"] {
        harness.adapter.set(&format!("/routes/{id}"), &json!({"id": id}), None).await.unwrap();
    }

    let res = harness.adapter.get("/routes/", true).await.unwrap();
    let dir = res.node().unwrap();
    assert!(dir.dir);
    assert_eq!(dir.key, "/apisix/routes");

    let children: Vec<_> = dir.nodes.as_ref().unwrap().iter().map(|n| n.key.as_str()).collect();
    assert_eq!(children, ["/apisix/routes/1", "/apisix/routes/2", "/apisix/routes/3"]);
}

#[tokio::test]
async fn test_directory_read_without_marker() {
    let harness = serving("/apisix").await;
    for id in ["1", "2"] {
        harness.adapter.set(&format!("/upstreams/{id}"), &json!({"id": id}), None).await.unwrap();
    }

    let res = harness.adapter.get("/upstreams/", true).await.unwrap();
    let dir = res.node().unwrap();
    assert_eq!(dir.key, "/apisix/upstreams");
    assert_eq!(dir.nodes.as_ref().unwrap().len(), 2);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_set_is_201_then_200() {
    let harness = serving("").await;

    let created = harness.adapter.set("/routes/1", &json!({"uri": "/a"}), None).await.unwrap();
    assert_eq!(created.status, STATUS_CREATED);
    assert_eq!(created.body.action, Some(Action::Set));
    let node = created.node().unwrap();
    assert_eq!(node.key, "/routes/1");
    assert_eq!(node.value, Some(json!({"uri": "/a"})));
    assert_eq!(created.headers.etcd_index, harness.store.revision());

    let replaced = harness.adapter.set("/routes/1", &json!({"uri": "/a"}), None).await.unwrap();
    assert_eq!(replaced.status, STATUS_OK);
}

#[tokio::test(start_paused = true)]
async fn test_set_with_ttl_expires() {
    let harness = serving("/apisix").await;

    let res = harness
        .adapter
        .set("/nodes/1", &json!({"host": "10.0.0.1"}), Some(Duration::from_secs(2)))
        .await
        .unwrap();
    let lease_id = res.body.lease_id.expect("lease should be attached");

    tokio::time::advance(Duration::from_millis(1500)).await;
    let renewed = harness.adapter.keepalive(lease_id).await.unwrap();
    assert_eq!(renewed.body.ttl, Some(2));

    tokio::time::advance(Duration::from_millis(1500)).await;
    assert!(!harness.adapter.get("/nodes/1", false).await.unwrap().is_not_found());

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(harness.adapter.get("/nodes/1", false).await.unwrap().is_not_found());

    let err = harness.adapter.keepalive(lease_id).await.unwrap_err();
    assert!(matches!(err, CompatError::Store(StoreError::LeaseNotFound { .. })));
}

#[tokio::test]
async fn test_set_with_oversized_ttl_is_rejected() {
    let harness = serving("/apisix").await;

    for ttl in [Duration::MAX, Duration::from_secs(u64::MAX)] {
        let err = harness.adapter.set("/routes/1", &json!({"uri": "/a"}), Some(ttl)).await.unwrap_err();
        assert!(
            matches!(err, CompatError::Store(StoreError::Server { ref message })
                if message == "etcdserver: too large lease TTL"),
            "got {err:?}"
        );
    }

    assert_eq!(harness.store.lease_count(), 0);
    assert!(harness.adapter.get("/routes/1", false).await.unwrap().is_not_found());
}

#[tokio::test]
async fn test_delete_missing_is_404() {
    let harness = serving("/apisix").await;
    let res = harness.adapter.delete("/routes/missing").await.unwrap();
    assert!(res.is_not_found());
    assert_eq!(res.body.message.as_deref(), Some("Key not found"));
}

#[tokio::test]
async fn test_delete_existing_reports_full_key() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();

    let res = harness.adapter.delete("/routes/1").await.unwrap();
    assert_eq!(res.status, STATUS_OK);
    assert_eq!(res.body.action, Some(Action::Delete));
    assert_eq!(res.body.key.as_deref(), Some("/apisix/routes/1"));
    assert!(harness.adapter.get("/routes/1", false).await.unwrap().is_not_found());
}

#[tokio::test]
async fn test_rmdir_removes_subtree() {
    let harness = serving("/apisix").await;
    for key in ["/ssl/1", "/ssl/2", "/routes/1"] {
        harness.adapter.set(key, &json!({}), None).await.unwrap();
    }

    let res = harness.adapter.rmdir("/ssl/").await.unwrap();
    assert_eq!(res.status, STATUS_OK);
    assert!(harness.adapter.get("/ssl/", true).await.unwrap().is_not_found());
    assert!(!harness.adapter.get("/routes/1", false).await.unwrap().is_not_found());

    assert!(harness.adapter.rmdir("/ssl/").await.unwrap().is_not_found());
}

// ============================================================================
// Compare-and-swap
// ============================================================================

#[tokio::test]
async fn test_atomic_set_succeeds_on_current_revision() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/1", &json!({"v": 1}), None).await.unwrap();
    let current = harness.adapter.get("/routes/1", false).await.unwrap();
    let revision = current.node().unwrap().modified_index;

    let res = harness
        .adapter
        .atomic_set("/routes/1", &json!({"v": 2}), None, revision)
        .await
        .unwrap();
    assert_eq!(res.status, STATUS_OK);
    assert_eq!(res.body.action, Some(Action::CompareAndSwap));
    assert_eq!(res.node().unwrap().key, "/apisix/routes/1");

    let after = harness.adapter.get("/routes/1", false).await.unwrap();
    assert_eq!(after.node().unwrap().value, Some(json!({"v": 2})));
}

#[tokio::test]
async fn test_atomic_set_conflict_leaves_value() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/1", &json!({"v": 1}), None).await.unwrap();
    let stale = harness.adapter.get("/routes/1", false).await.unwrap().node().unwrap().modified_index;
    harness.adapter.set("/routes/1", &json!({"v": 2}), None).await.unwrap();

    let err = harness
        .adapter
        .atomic_set("/routes/1", &json!({"v": 3}), None, stale)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "value changed before overwritten");

    let after = harness.adapter.get("/routes/1", false).await.unwrap();
    assert_eq!(after.node().unwrap().value, Some(json!({"v": 2})));
}

#[tokio::test]
async fn test_atomic_set_conflict_revokes_its_lease() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/1", &json!({"v": 1}), None).await.unwrap();
    let stale = harness.adapter.get("/routes/1", false).await.unwrap().node().unwrap().modified_index;
    harness.adapter.set("/routes/1", &json!({"v": 2}), None).await.unwrap();

    let ttl = Some(Duration::from_secs(30));
    let result = harness.adapter.atomic_set("/routes/1", &json!({"v": 3}), ttl, stale).await;
    assert!(matches!(result, Err(CompatError::ValueChanged)));
    assert_eq!(harness.store.lease_count(), 0);

    let current = harness.adapter.get("/routes/1", false).await.unwrap().node().unwrap().modified_index;
    let res = harness.adapter.atomic_set("/routes/1", &json!({"v": 3}), ttl, current).await.unwrap();
    assert_eq!(res.status, STATUS_OK);
    assert_eq!(harness.store.lease_count(), 1);
}

#[tokio::test]
async fn test_atomic_set_on_missing_key_with_zero_revision_creates() {
    let harness = serving("/apisix").await;
    harness.adapter.atomic_set("/routes/9", &json!({"v": 1}), None, 0).await.unwrap();
    assert!(!harness.adapter.get("/routes/9", false).await.unwrap().is_not_found());
}

// ============================================================================
// Sequential ids
// ============================================================================

#[tokio::test]
async fn test_push_generates_increasing_ids() {
    let harness = serving("/apisix").await;

    let mut ids = Vec::new();
    for i in 0..10 {
        let res = harness.adapter.push("/queue", json!({"n": i}), None).await.unwrap();
        assert_eq!(res.body.action, Some(Action::Create));
        let node = res.node().unwrap();
        let id = node.value.as_ref().unwrap()["id"].as_str().unwrap().to_owned();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(node.key, format!("/apisix/queue/{id}"));
        ids.push(id);
    }

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    let listing = harness.adapter.get("/queue/", true).await.unwrap();
    assert_eq!(listing.node().unwrap().nodes.as_ref().unwrap().len(), 10);
}

#[tokio::test]
async fn test_push_rejects_non_object() {
    let harness = serving("/apisix").await;
    let before = harness.store.revision();

    let err = harness.adapter.push("/queue", json!("plain"), None).await.unwrap_err();
    assert!(matches!(err, CompatError::InvalidValue { .. }));
    assert_eq!(harness.store.revision(), before);
}

// ============================================================================
// Write gate
// ============================================================================

#[tokio::test]
async fn test_unreadable_config_denies_all_writes() {
    let harness = serving("/apisix").await;
    harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();
    let lease = harness.store.client().grant(60).await.unwrap();

    harness.config.fail(ConfigError::Unavailable("config.yaml vanished".into()));

    let denied = |err: CompatError| {
        matches!(err, CompatError::Store(StoreError::WriteDenied { ref reason })
            if reason == "configuration unavailable: config.yaml vanished")
    };
    assert!(denied(harness.adapter.set("/routes/2", &json!({}), None).await.unwrap_err()));
    assert!(denied(harness.adapter.delete("/routes/1").await.unwrap_err()));
    assert!(denied(harness.adapter.rmdir("/routes/").await.unwrap_err()));
    assert!(denied(harness.adapter.keepalive(lease.id).await.unwrap_err()));
    assert!(denied(harness.adapter.push("/q", json!({}), None).await.unwrap_err()));
    assert!(denied(
        harness.adapter.set("/x", &json!({}), Some(Duration::from_secs(5))).await.unwrap_err()
    ));

    // Reads are not gated.
    assert!(!harness.adapter.get("/routes/1", false).await.unwrap().is_not_found());
}

#[tokio::test]
async fn test_data_plane_writes_are_allowed() {
    let harness = Harness::serving("/apisix", DeploymentRole::DataPlane).await;
    let res = harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();
    assert_eq!(res.status, STATUS_CREATED);
}

#[tokio::test]
async fn test_role_change_applies_to_next_write() {
    let harness = serving("/apisix").await;
    harness.config.fail(ConfigError::Unavailable("reloading".into()));
    assert!(harness.adapter.set("/a", &json!({}), None).await.is_err());

    harness.config.set(local_config("/apisix", DeploymentRole::ControlPlane));
    assert!(harness.adapter.set("/a", &json!({}), None).await.is_ok());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_bootstrap_client_not_reused_after_serving() {
    let harness = Harness::bootstrap("/apisix", DeploymentRole::Traditional);

    harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();
    assert_eq!(harness.manager.state().await, HandleState::Bootstrap);
    assert!(harness.connector.connections()[0].unix_socket_proxy.is_none());

    harness.manager.begin_serving().await;
    assert!(!harness.adapter.get("/routes/1", false).await.unwrap().is_not_found());

    let clients = harness.connector.clients();
    assert!(clients[0].is_closed(), "bootstrap client must be closed");
    assert!(!clients.last().unwrap().is_closed(), "steady client must stay open");
    assert_eq!(harness.manager.state().await, HandleState::Steady);
}

#[tokio::test]
async fn test_dead_proxy_socket_falls_back_to_direct() {
    let harness = Harness::serving("/apisix", DeploymentRole::Traditional).await;
    harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();

    let connections = harness.connector.connections();
    assert_eq!(connections.len(), 2);
    let expected = format!("unix:{}/conf/config_listen.sock", harness.runtime_dir().display());
    assert_eq!(connections[0].unix_socket_proxy.as_deref(), Some(expected.as_str()));
    assert_eq!(connections[0].http_host, ["http://127.0.0.1:2379"]);
    assert!(connections[1].unix_socket_proxy.is_none());
    assert_eq!(connections[1].http_host, ["http://127.0.0.1:2379"]);
}

#[tokio::test]
async fn test_live_proxy_socket_is_used() {
    let harness = Harness::bootstrap("/apisix", DeploymentRole::Traditional);
    let conf = harness.runtime_dir().join("conf");
    std::fs::create_dir_all(&conf).unwrap();
    std::fs::write(conf.join("config_listen.sock"), b"").unwrap();
    harness.manager.begin_serving().await;

    harness.adapter.get("/routes/1", false).await.unwrap();
    let connections = harness.connector.connections();
    assert_eq!(connections.len(), 1);
    assert!(connections[0].unix_socket_proxy.is_some());
}

#[tokio::test]
async fn test_construction_error_is_propagated() {
    let harness = serving("/apisix").await;
    harness.connector.fail_with(StoreError::connection("connection refused"));

    let err = harness.adapter.get("/routes/1", false).await.unwrap_err();
    assert!(matches!(err, CompatError::Store(StoreError::Connection { .. })));

    harness.connector.clear_failure();
    assert!(harness.adapter.get("/routes/1", false).await.is_ok());
}

// ============================================================================
// Watch and version
// ============================================================================

#[tokio::test]
async fn test_watch_translates_batches() {
    let harness = serving("/apisix").await;
    let mut stream = harness.adapter.watch("/routes", 0).await.unwrap();

    harness.adapter.set("/routes/1", &json!({"uri": "/a"}), None).await.unwrap();
    let event = stream.next().await.unwrap().unwrap();
    assert_eq!(event.body.action, Action::Set);
    assert_eq!(event.body.node[0].key, "/apisix/routes/1");
    assert_eq!(event.body.node[0].value, Some(json!({"uri": "/a"})));

    harness.adapter.delete("/routes/1").await.unwrap();
    let event = stream.next().await.unwrap().unwrap();
    assert_eq!(event.body.action, Action::Delete);
    assert_eq!(event.headers.etcd_index, harness.store.revision());

    stream.close().await;
}

#[tokio::test]
async fn test_watch_replays_history_from_revision() {
    let harness = serving("/apisix").await;
    let first = harness.adapter.set("/routes/1", &json!({}), None).await.unwrap();
    harness.adapter.set("/routes/2", &json!({}), None).await.unwrap();
    harness.adapter.set("/services/1", &json!({}), None).await.unwrap();

    let mut stream = harness.adapter.watch("/routes", first.headers.etcd_index).await.unwrap();
    let event = stream.next().await.unwrap().unwrap();
    let keys: Vec<_> = event.body.node.iter().map(|n| n.key.as_str()).collect();
    assert_eq!(keys, ["/apisix/routes/1", "/apisix/routes/2"]);
}

#[tokio::test]
async fn test_watch_on_compacted_revision() {
    let harness = serving("/apisix").await;
    for i in 0..5 {
        harness.adapter.set("/routes/1", &json!({"v": i}), None).await.unwrap();
    }
    harness.store.compact(4).unwrap();

    let mut stream = harness.adapter.watch("/routes", 2).await.unwrap();
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "compacted");
    assert!(matches!(err, CompatError::Compacted { compact_revision: 4 }));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_server_version() {
    let harness = serving("/apisix").await;
    let version = harness.adapter.server_version().await.unwrap();
    assert_eq!(version.server, "3.5.0");
    assert_eq!(version.cluster, "3.5.0");
}
