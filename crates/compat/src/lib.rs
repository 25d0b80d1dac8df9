//! Legacy (v2-style) etcd compatibility layer over a v3 store.
//!
//! This crate lets code written against the hierarchical node/directory
//! model keep working against a revisioned v3 store. It owns client
//! acquisition across the process lifecycle, gates writes by deployment
//! role, and builds sequential ids and compare-and-swap out of the store's
//! transaction primitive.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EtcdAdapter                          │
//! │  get │ set │ delete │ rmdir │ keepalive │ push │ atomic_set │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  ClientLifecycleManager                     │
//! │     bootstrap (direct) ──begin_serving──► steady (proxied)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │      ClientFactory ──► GatedStoreOperations ──► WriteGate   │
//! ├─────────────────────────────────────────────────────────────┤
//! │             etcd-compat-store (StoreClient)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use etcd_compat::{
//!     ClientFactory, ClientLifecycleManager, EtcdAdapter,
//!     config::{DeploymentRole, EtcdSection, LocalConfig, StaticConfig},
//! };
//! use etcd_compat_store::{MemoryConnector, MemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let etcd = EtcdSection::builder().host(vec!["http://127.0.0.1:2379"]).build()?;
//!     let config = LocalConfig::new(etcd, DeploymentRole::ControlPlane);
//!
//!     let factory = ClientFactory::builder()
//!         .connector(Arc::new(MemoryConnector::new(MemoryStore::new())))
//!         .source(Arc::new(StaticConfig::new(config)))
//!         .runtime_dir("/usr/local/apisix")
//!         .build();
//!     let manager = Arc::new(ClientLifecycleManager::new(factory));
//!     manager.begin_serving().await;
//!
//!     let adapter = EtcdAdapter::new(manager);
//!     let created = adapter.set("/routes/1", &json!({"uri": "/a"}), None).await?;
//!     assert_eq!(created.status, 201);
//!
//!     let read = adapter.get("/routes/1", false).await?;
//!     assert_eq!(read.node().map(|n| n.key.as_str()), Some("/apisix/routes/1"));
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with a wired-up in-memory harness and
//!   assertion macros.
//! - **`failpoints`**: Enables fail points in the in-memory store.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod cas;
pub mod config;
pub mod error;
pub mod factory;
pub mod gate;
pub mod gated;
pub mod legacy;
pub mod lifecycle;
pub mod sequence;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod translate;

pub use adapter::{EtcdAdapter, LegacyWatchStream};
pub use config::{ConfigError, ConfigSource, DeploymentRole, LocalConfig};
pub use error::{CompatError, Result};
pub use factory::{ClientFactory, ClientHandle, Routing, Subsystem};
pub use gate::{WriteDecision, WriteGate};
pub use gated::GatedStoreOperations;
pub use legacy::{Action, LegacyResponse, LegacyWatchEvent, Node};
pub use lifecycle::{ClientLifecycleManager, HandleState, ProcessPhase};
