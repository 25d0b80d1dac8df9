//! Shared test utilities for store clients.
//!
//! Feature-gated behind `testutil` so it never reaches production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! etcd-compat-store = { path = "../store", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use etcd_compat_store::testutil::{make_key, populated_store};
//! ```

use crate::{
    client::MutatingStoreOperations,
    error::{StoreError, StoreResult},
    memory::MemoryStore,
    types::PutOptions,
};

/// Create a deterministic key under `dir`.
///
/// Produces keys like `"/routes/000042"`; the zero-padding keeps key order
/// equal to numeric order.
#[must_use]
pub fn make_key(dir: &str, idx: usize) -> Vec<u8> {
    format!("{dir}/{idx:06}").into_bytes()
}

/// Create a JSON object value tagged with `idx`.
#[must_use]
pub fn make_json_value(idx: usize) -> Vec<u8> {
    format!(r#"{{"id":"{idx}"}}"#).into_bytes()
}

/// Create a [`MemoryStore`] holding `count` JSON entries under `dir`.
///
/// # Panics
///
/// Panics if any write fails (should not happen with `MemoryStore`).
pub async fn populated_store(dir: &str, count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let client = store.client();
    for i in 0..count {
        client
            .set(&make_key(dir, i), make_json_value(i), PutOptions::default())
            .await
            .expect("populate set failed");
    }
    store
}

/// Assert that a [`StoreResult`] is `Ok` and return the inner value.
#[macro_export]
macro_rules! assert_store_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StoreError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StoreError: {e:?}", $msg),
        }
    };
}

/// Assert that a [`StoreResult`] is a [`StoreError::WriteDenied`].
#[macro_export]
macro_rules! assert_write_denied {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StoreError::WriteDenied { .. })),
            "expected StoreError::WriteDenied, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StoreResult`] is a [`StoreError::Connection`].
#[macro_export]
macro_rules! assert_connection_error {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StoreError::Connection { .. })),
            "expected StoreError::Connection, got: {:?}",
            $result,
        );
    };
}

/// Returns `true` if the result is a `WriteDenied` error.
pub fn is_write_denied<T>(result: &StoreResult<T>) -> bool {
    matches!(result, Err(StoreError::WriteDenied { .. }))
}
