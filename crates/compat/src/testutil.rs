//! Shared test utilities for the compatibility layer.
//!
//! Feature-gated behind `testutil`. [`Harness`] wires an [`EtcdAdapter`] to
//! a [`MemoryStore`] through the real factory, gate and lifecycle manager,
//! keeping handles on every piece so tests can inspect or perturb them.
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use etcd_compat::{config::DeploymentRole, testutil::Harness};
//!
//! # async fn run() {
//! let harness = Harness::serving("/apisix", DeploymentRole::ControlPlane).await;
//! let res = harness.adapter.get("/routes/1", false).await.unwrap();
//! assert!(res.is_not_found());
//! # }
//! ```

use std::{path::Path, sync::Arc};

use etcd_compat_store::{MemoryConnector, MemoryStore};

use crate::{
    adapter::EtcdAdapter,
    config::{DeploymentRole, EtcdSection, LocalConfig, SharedConfig},
    factory::ClientFactory,
    lifecycle::ClientLifecycleManager,
};

/// Build a valid [`LocalConfig`] with `prefix` and `role`.
///
/// # Panics
///
/// Panics if `prefix` is not a valid key prefix.
#[must_use]
pub fn local_config(prefix: &str, role: DeploymentRole) -> LocalConfig {
    let etcd = EtcdSection::builder()
        .host(vec!["http://127.0.0.1:2379"])
        .prefix(prefix)
        .build()
        .expect("test etcd section should be valid");
    LocalConfig::new(etcd, role)
}

/// An adapter over an in-memory store with every collaborator exposed.
pub struct Harness {
    /// Backing store.
    pub store: MemoryStore,
    /// Connector recording every client construction.
    pub connector: MemoryConnector,
    /// Configuration shared by the factory and the write gate.
    pub config: Arc<SharedConfig>,
    /// Lifecycle manager owning the client.
    pub manager: Arc<ClientLifecycleManager>,
    /// Entry points under test.
    pub adapter: EtcdAdapter,
    _runtime_dir: tempfile::TempDir,
}

impl Harness {
    /// A harness in the bootstrap phase.
    ///
    /// # Panics
    ///
    /// Panics if a temporary runtime directory cannot be created.
    #[must_use]
    pub fn bootstrap(prefix: &str, role: DeploymentRole) -> Self {
        let runtime_dir = tempfile::tempdir().expect("failed to create runtime dir");
        let store = MemoryStore::new();
        let connector = MemoryConnector::new(store.clone());
        let config = Arc::new(SharedConfig::new(local_config(prefix, role)));
        let factory = ClientFactory::builder()
            .connector(Arc::new(connector.clone()))
            .source(Arc::clone(&config) as _)
            .runtime_dir(runtime_dir.path())
            .build();
        let manager = Arc::new(ClientLifecycleManager::new(factory));
        let adapter = EtcdAdapter::new(Arc::clone(&manager));
        Self { store, connector, config, manager, adapter, _runtime_dir: runtime_dir }
    }

    /// A harness already in the serving phase.
    pub async fn serving(prefix: &str, role: DeploymentRole) -> Self {
        let harness = Self::bootstrap(prefix, role);
        harness.manager.begin_serving().await;
        harness
    }

    /// Runtime directory the config server socket would live under.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        self._runtime_dir.path()
    }
}

/// Assert that a [`LegacyResponse`](crate::LegacyResponse) result is a 404.
#[macro_export]
macro_rules! assert_legacy_not_found {
    ($result:expr) => {
        match $result {
            Ok(res) => assert!(res.is_not_found(), "expected 404, got: {res:?}"),
            Err(e) => panic!("expected 404, got error: {e:?}"),
        }
    };
}

/// Assert that a result failed with the given [`CompatError`](crate::CompatError) pattern.
#[macro_export]
macro_rules! assert_compat_err {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {},
            other => panic!("expected {}, got: {other:?}", stringify!($pattern)),
        }
    };
}
