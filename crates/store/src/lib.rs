//! Native v3 key-value store client surface.
//!
//! This crate defines the store-facing half of the etcd compatibility layer:
//! the v3 data model, the client traits every store session implements, and
//! an in-memory store that implements them for development and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 etcd-compat (legacy surface)                │
//! │      get / set / delete / rmdir / keepalive / push / watch  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    etcd-compat-store                        │
//! │   ReadOperations + MutatingStoreOperations = StoreClient    │
//! │                 StoreConnector → StoreClient                │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryStore  │          network client (out of tree)        │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use etcd_compat_store::{MemoryStore, MutatingStoreOperations, PutOptions, ReadOperations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!     let client = store.client();
//!
//!     let res = client.set(b"/routes/1", br#"{"uri":"/"}"#.to_vec(), PutOptions::default()).await?;
//!     assert_eq!(res.header.revision, 2);
//!
//!     let read = client.range(b"/routes/1").await?;
//!     assert_eq!(read.kvs[0].mod_revision, 2);
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StoreResult<T>`]. Implementations map raw server
//! messages through [`StoreError::from_server_message`] so authentication
//! and permission failures arrive as distinct variants.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared helpers and assertion macros.
//! - **`failpoints`**: Compiles the `fail` crate's injection points into [`MemoryClient`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;
pub mod watch;

pub use client::{
    MutatingOperation, MutatingStoreOperations, ReadOperations, StoreClient, StoreConnector,
};
pub use config::ClientConfig;
pub use error::{BoxError, StoreError, StoreResult};
pub use memory::{MemoryClient, MemoryConnector, MemoryStore};
pub use types::{
    Compare, CompareResult, CompareTarget, DeleteResponse, Event, EventType, KeyValue,
    LeaseGrantResponse, LeaseId, LeaseKeepAliveResponse, LeaseRevokeResponse, PutOptions,
    PutResponse, RangeResponse, ResponseHeader, Revision, TxnOp, TxnOpResponse, TxnRequest,
    TxnResponse, VersionInfo, WatchRequest, WatchResponse,
};
pub use watch::{WatchSender, WatchStream};
