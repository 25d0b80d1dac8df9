//! In-memory store implementation.
//!
//! [`MemoryStore`] holds the keyspace; [`MemoryClient`] is a session on it
//! implementing [`StoreClient`]; [`MemoryConnector`] hands out clients and
//! records the configuration each one was built with.
//!
//! # Features
//!
//! - **Revisioned**: every mutating request advances one global revision; entries carry create/mod
//!   revisions and a version count
//! - **Ordered storage**: keys live in a [`BTreeMap`] so prefix reads come back in key order
//! - **Leases**: keys attached to a lease are deleted when it is revoked or expires
//! - **Transactions**: guards and both branches evaluate under one lock
//! - **Watch history**: events are retained until [`MemoryStore::compact`]
//!
//! # Example
//!
//! ```
//! use etcd_compat_store::{MemoryStore, MutatingStoreOperations, PutOptions, ReadOperations};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! let client = store.client();
//!
//! client.set(b"/routes/1", b"{}".to_vec(), PutOptions::default()).await.unwrap();
//! let res = client.range_prefix(b"/routes").await.unwrap();
//! assert_eq!(res.kvs.len(), 1);
//! # });
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; everything is lost when the store is dropped
//! - Lease expiry is applied lazily at the start of each request rather than by a timer

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::{
    client::{MutatingStoreOperations, ReadOperations, StoreClient, StoreConnector},
    config::ClientConfig,
    error::{StoreError, StoreResult},
    types::{
        Compare, CompareResult, CompareTarget, DeleteResponse, Event, EventType, KeyValue,
        LeaseGrantResponse, LeaseId, LeaseKeepAliveResponse, LeaseRevokeResponse, PutOptions,
        PutResponse, RangeResponse, ResponseHeader, Revision, TxnOp, TxnOpResponse, TxnRequest,
        TxnResponse, VersionInfo, WatchRequest, WatchResponse, prefix_range_end,
    },
    watch::{WatchSender, WatchStream},
};

const CLUSTER_ID: u64 = 0x1c2d_3e4f_5a6b_7c8d;
const MEMBER_ID: u64 = 0x8e9f_a0b1_c2d3_e4f5;
const RAFT_TERM: u64 = 2;
const FIRST_LEASE_ID: LeaseId = 0x694d_7a1c_0000_0001;
const DEFAULT_VERSION: &str = "3.5.0";

/// Shortest TTL a lease is granted for, in seconds.
pub const MIN_LEASE_TTL: i64 = 1;

/// Longest TTL a lease is granted for, in seconds.
pub const MAX_LEASE_TTL: i64 = 9_000_000_000;

const MSG_LEASE_TTL_TOO_LARGE: &str = "etcdserver: too large lease TTL";

fn lease_deadline(ttl: i64) -> StoreResult<Instant> {
    Instant::now()
        .checked_add(Duration::from_secs(ttl.unsigned_abs()))
        .ok_or_else(|| StoreError::server(MSG_LEASE_TTL_TOO_LARGE))
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    create_revision: Revision,
    mod_revision: Revision,
    version: i64,
    lease: LeaseId,
}

impl Entry {
    fn to_kv(&self, key: &[u8]) -> KeyValue {
        KeyValue {
            key: Bytes::copy_from_slice(key),
            value: self.value.clone(),
            create_revision: self.create_revision,
            mod_revision: self.mod_revision,
            version: self.version,
            lease: self.lease,
        }
    }
}

#[derive(Debug)]
struct Lease {
    ttl: i64,
    expires_at: Instant,
    keys: BTreeSet<Vec<u8>>,
}

struct Watcher {
    request: WatchRequest,
    sender: WatchSender,
}

struct State {
    data: BTreeMap<Vec<u8>, Entry>,
    revision: Revision,
    leases: HashMap<LeaseId, Lease>,
    next_lease_id: LeaseId,
    history: Vec<Event>,
    compact_revision: Revision,
    watchers: Vec<Watcher>,
    version: VersionInfo,
}

impl State {
    fn new(version: VersionInfo) -> Self {
        Self {
            data: BTreeMap::new(),
            revision: 1,
            leases: HashMap::new(),
            next_lease_id: FIRST_LEASE_ID,
            history: Vec::new(),
            compact_revision: 0,
            watchers: Vec::new(),
            version,
        }
    }

    fn header(&self) -> ResponseHeader {
        ResponseHeader {
            cluster_id: CLUSTER_ID,
            member_id: MEMBER_ID,
            revision: self.revision,
            raft_term: RAFT_TERM,
        }
    }

    fn get_kv(&self, key: &[u8]) -> Option<KeyValue> {
        self.data.get(key).map(|entry| entry.to_kv(key))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<KeyValue> {
        let upper = match prefix_range_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        self.data
            .range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), upper))
            .map(|(key, entry)| entry.to_kv(key))
            .collect()
    }

    fn ensure_lease(&self, lease: Option<LeaseId>) -> StoreResult<LeaseId> {
        match lease {
            None | Some(0) => Ok(0),
            Some(id) if self.leases.contains_key(&id) => Ok(id),
            Some(id) => Err(StoreError::LeaseNotFound { id }),
        }
    }

    fn put_entry(
        &mut self,
        key: &[u8],
        value: Bytes,
        lease: LeaseId,
        revision: Revision,
        events: &mut Vec<Event>,
    ) -> Option<KeyValue> {
        let prev = self.get_kv(key);

        if let Some(prev) = &prev
            && prev.lease != 0
            && prev.lease != lease
            && let Some(old) = self.leases.get_mut(&prev.lease)
        {
            old.keys.remove(key);
        }
        if lease != 0
            && let Some(attached) = self.leases.get_mut(&lease)
        {
            attached.keys.insert(key.to_vec());
        }

        let entry = Entry {
            value,
            create_revision: prev.as_ref().map_or(revision, |p| p.create_revision),
            mod_revision: revision,
            version: prev.as_ref().map_or(1, |p| p.version + 1),
            lease,
        };
        let kv = entry.to_kv(key);
        self.data.insert(key.to_vec(), entry);
        events.push(Event { event_type: EventType::Put, kv, prev_kv: prev.clone() });
        prev
    }

    fn delete_entry(
        &mut self,
        key: &[u8],
        revision: Revision,
        events: &mut Vec<Event>,
    ) -> Option<KeyValue> {
        let prev = self.data.remove(key)?.to_kv(key);
        if prev.lease != 0
            && let Some(lease) = self.leases.get_mut(&prev.lease)
        {
            lease.keys.remove(key);
        }
        let tombstone = KeyValue {
            key: Bytes::copy_from_slice(key),
            mod_revision: revision,
            ..KeyValue::default()
        };
        events.push(Event { event_type: EventType::Delete, kv: tombstone, prev_kv: Some(prev.clone()) });
        Some(prev)
    }

    /// Publishes the events of one request at `revision`. A request that
    /// changed nothing leaves the revision where it was.
    fn commit(&mut self, revision: Revision, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        self.revision = revision;
        self.history.extend(events.iter().cloned());

        let header = self.header();
        self.watchers.retain(|watcher| {
            let matching: Vec<Event> =
                events.iter().filter(|e| watcher.request.matches(&e.kv.key)).cloned().collect();
            if matching.is_empty() {
                return !watcher.sender.is_closed();
            }
            watcher.sender.send(WatchResponse { header, events: matching, ..WatchResponse::default() })
        });
    }

    fn delete_keys(&mut self, keys: Vec<Vec<u8>>) -> DeleteResponse {
        let revision = self.revision + 1;
        let mut events = Vec::new();
        let prev_kvs: Vec<KeyValue> =
            keys.iter().filter_map(|key| self.delete_entry(key, revision, &mut events)).collect();
        self.commit(revision, events);
        DeleteResponse { header: self.header(), deleted: prev_kvs.len() as i64, prev_kvs }
    }

    fn revoke_lease(&mut self, id: LeaseId) -> StoreResult<()> {
        let lease = self.leases.remove(&id).ok_or(StoreError::LeaseNotFound { id })?;
        self.delete_keys(lease.keys.into_iter().collect());
        Ok(())
    }

    fn reap_expired(&mut self, now: Instant) {
        let mut expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();
        for id in expired {
            if let Some(lease) = self.leases.remove(&id) {
                tracing::debug!(lease = id, "lease expired");
                self.delete_keys(lease.keys.into_iter().collect());
            }
        }
    }

    fn evaluate(&self, compare: &Compare) -> bool {
        let entry = self.data.get(compare.key.as_ref());
        let ordering = match (&compare.target, entry) {
            (CompareTarget::Value(_), None) => return false,
            (CompareTarget::Value(expected), Some(e)) => e.value.as_ref().cmp(expected.as_ref()),
            (CompareTarget::Version(v), e) => e.map_or(0, |e| e.version).cmp(v),
            (CompareTarget::Create(r), e) => e.map_or(0, |e| e.create_revision).cmp(r),
            (CompareTarget::Mod(r), e) => e.map_or(0, |e| e.mod_revision).cmp(r),
            (CompareTarget::Lease(l), e) => e.map_or(0, |e| e.lease).cmp(l),
        };
        match compare.result {
            CompareResult::Equal => ordering.is_eq(),
            CompareResult::NotEqual => ordering.is_ne(),
            CompareResult::Greater => ordering.is_gt(),
            CompareResult::Less => ordering.is_lt(),
        }
    }

    fn txn(&mut self, request: TxnRequest) -> StoreResult<TxnResponse> {
        let succeeded = request.compare.iter().all(|c| self.evaluate(c));
        let ops = if succeeded { request.success } else { request.failure };

        // Validate before applying anything so a bad lease has no partial effect.
        for op in &ops {
            if let TxnOp::Put { options, .. } = op {
                self.ensure_lease(options.lease)?;
            }
        }

        enum Outcome {
            Range(Vec<KeyValue>),
            Put(Option<KeyValue>),
            Delete(Option<KeyValue>),
        }

        let revision = self.revision + 1;
        let mut events = Vec::new();
        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            let outcome = match op {
                TxnOp::Range { key } => Outcome::Range(self.get_kv(&key).into_iter().collect()),
                TxnOp::Put { key, value, options } => {
                    let lease = options.lease.unwrap_or(0);
                    let prev = self.put_entry(&key, value, lease, revision, &mut events);
                    Outcome::Put(if options.prev_kv { prev } else { None })
                },
                TxnOp::Delete { key } => {
                    Outcome::Delete(self.delete_entry(&key, revision, &mut events))
                },
            };
            outcomes.push(outcome);
        }
        self.commit(revision, events);

        let header = self.header();
        let responses = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Outcome::Range(kvs) => TxnOpResponse::Range(RangeResponse {
                    header,
                    count: kvs.len() as i64,
                    kvs,
                    more: false,
                }),
                Outcome::Put(prev_kv) => TxnOpResponse::Put(PutResponse { header, prev_kv }),
                Outcome::Delete(prev) => TxnOpResponse::Delete(DeleteResponse {
                    header,
                    deleted: i64::from(prev.is_some()),
                    prev_kvs: prev.into_iter().collect(),
                }),
            })
            .collect();

        Ok(TxnResponse { header, succeeded, responses })
    }

    fn watch(&mut self, request: WatchRequest) -> WatchStream {
        let (sender, stream) = WatchStream::channel();
        let header = self.header();

        if request.start_revision > 0 && request.start_revision < self.compact_revision {
            sender.send(WatchResponse {
                header,
                events: Vec::new(),
                compact_revision: self.compact_revision,
                canceled: true,
            });
            return stream;
        }

        if request.start_revision > 0 {
            let backlog: Vec<Event> = self
                .history
                .iter()
                .filter(|e| {
                    e.kv.mod_revision >= request.start_revision && request.matches(&e.kv.key)
                })
                .cloned()
                .collect();
            if !backlog.is_empty() {
                sender.send(WatchResponse { header, events: backlog, ..WatchResponse::default() });
            }
        }

        self.watchers.push(Watcher { request, sender });
        stream
    }
}

/// In-memory keyspace shared by every [`MemoryClient`] built from it.
///
/// # Cloning
///
/// `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the
/// same keyspace.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store at revision 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_version(DEFAULT_VERSION, DEFAULT_VERSION)
    }

    /// Creates an empty store reporting the given versions.
    #[must_use]
    pub fn with_version(server: &str, cluster: &str) -> Self {
        let version = VersionInfo { server: server.to_owned(), cluster: cluster.to_owned() };
        Self { state: Arc::new(Mutex::new(State::new(version))) }
    }

    /// Opens a direct session.
    #[must_use]
    pub fn client(&self) -> MemoryClient {
        MemoryClient::new(self.clone(), None)
    }

    /// Returns the current revision.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.state.lock().revision
    }

    /// Returns the revision below which watch history has been discarded.
    #[must_use]
    pub fn compact_revision(&self) -> Revision {
        self.state.lock().compact_revision
    }

    /// Returns the number of live leases.
    #[must_use]
    pub fn lease_count(&self) -> usize {
        self.state.lock().leases.len()
    }

    /// Discards watch history older than `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Server`] if `revision` is ahead of the store or
    /// not ahead of the previous compaction.
    pub fn compact(&self, revision: Revision) -> StoreResult<()> {
        let mut state = self.state.lock();
        if revision > state.revision {
            return Err(StoreError::server("etcdserver: mvcc: required revision is a future revision"));
        }
        if revision <= state.compact_revision {
            return Err(StoreError::server("etcdserver: mvcc: required revision has been compacted"));
        }
        state.history.retain(|e| e.kv.mod_revision >= revision);
        state.compact_revision = revision;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStore")
            .field("revision", &state.revision)
            .field("keys", &state.data.len())
            .field("leases", &state.leases.len())
            .finish_non_exhaustive()
    }
}

/// A session on a [`MemoryStore`].
///
/// Clones share the session; closing one closes all of them.
#[derive(Clone)]
pub struct MemoryClient {
    store: MemoryStore,
    unix_socket_proxy: Option<String>,
    closed: Arc<AtomicBool>,
}

impl MemoryClient {
    fn new(store: MemoryStore, unix_socket_proxy: Option<String>) -> Self {
        Self { store, unix_socket_proxy, closed: Arc::new(AtomicBool::new(false)) }
    }

    /// Returns `true` once [`close`](StoreClient::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Locks the keyspace after applying any due lease expirations.
    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        if self.is_closed() {
            return Err(StoreError::connection("client closed"));
        }
        let mut state = self.store.state.lock();
        state.reap_expired(Instant::now());
        Ok(state)
    }
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("unix_socket_proxy", &self.unix_socket_proxy)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReadOperations for MemoryClient {
    #[tracing::instrument(skip(self), fields(key = %String::from_utf8_lossy(key)))]
    async fn range(&self, key: &[u8]) -> StoreResult<RangeResponse> {
        let state = self.state()?;
        let kvs: Vec<KeyValue> = state.get_kv(key).into_iter().collect();
        Ok(RangeResponse { header: state.header(), count: kvs.len() as i64, kvs, more: false })
    }

    #[tracing::instrument(skip(self), fields(prefix = %String::from_utf8_lossy(prefix)))]
    async fn range_prefix(&self, prefix: &[u8]) -> StoreResult<RangeResponse> {
        fail_point!("memory-range", |message: Option<String>| {
            Err(StoreError::from_server_message(message.unwrap_or_default()))
        });

        let state = self.state()?;
        let kvs = state.scan_prefix(prefix);
        Ok(RangeResponse { header: state.header(), count: kvs.len() as i64, kvs, more: false })
    }

    #[tracing::instrument(skip(self, request), fields(compares = request.compare.len()))]
    async fn txn(&self, request: TxnRequest) -> StoreResult<TxnResponse> {
        self.state()?.txn(request)
    }

    #[tracing::instrument(skip(self, request), fields(start_revision = request.start_revision))]
    async fn watch(&self, request: WatchRequest) -> StoreResult<WatchStream> {
        Ok(self.state()?.watch(request))
    }

    async fn version(&self) -> StoreResult<VersionInfo> {
        Ok(self.state()?.version.clone())
    }
}

#[async_trait]
impl MutatingStoreOperations for MemoryClient {
    #[tracing::instrument(skip(self, value, options), fields(key = %String::from_utf8_lossy(key)))]
    async fn set(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<PutResponse> {
        fail_point!("memory-put", |message: Option<String>| {
            Err(StoreError::from_server_message(message.unwrap_or_default()))
        });

        let mut state = self.state()?;
        let lease = state.ensure_lease(options.lease)?;
        let revision = state.revision + 1;
        let mut events = Vec::new();
        let prev = state.put_entry(key, Bytes::from(value), lease, revision, &mut events);
        state.commit(revision, events);
        Ok(PutResponse { header: state.header(), prev_kv: if options.prev_kv { prev } else { None } })
    }

    #[tracing::instrument(skip(self, value, options), fields(key = %String::from_utf8_lossy(key)))]
    async fn setnx(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<TxnResponse> {
        let key = Bytes::copy_from_slice(key);
        self.state()?.txn(TxnRequest {
            compare: vec![Compare::create_revision(key.clone(), CompareResult::Equal, 0)],
            success: vec![TxnOp::Put { key, value: Bytes::from(value), options }],
            failure: Vec::new(),
        })
    }

    #[tracing::instrument(skip(self, value, options), fields(key = %String::from_utf8_lossy(key)))]
    async fn setx(
        &self,
        key: &[u8],
        value: Vec<u8>,
        options: PutOptions,
    ) -> StoreResult<TxnResponse> {
        let key = Bytes::copy_from_slice(key);
        self.state()?.txn(TxnRequest {
            compare: vec![Compare::create_revision(key.clone(), CompareResult::Greater, 0)],
            success: vec![TxnOp::Put { key, value: Bytes::from(value), options }],
            failure: Vec::new(),
        })
    }

    #[tracing::instrument(skip(self), fields(key = %String::from_utf8_lossy(key)))]
    async fn delete(&self, key: &[u8]) -> StoreResult<DeleteResponse> {
        Ok(self.state()?.delete_keys(vec![key.to_vec()]))
    }

    #[tracing::instrument(skip(self), fields(prefix = %String::from_utf8_lossy(prefix)))]
    async fn rmdir(&self, prefix: &[u8]) -> StoreResult<DeleteResponse> {
        let mut state = self.state()?;
        let keys = state.scan_prefix(prefix).into_iter().map(|kv| kv.key.to_vec()).collect();
        Ok(state.delete_keys(keys))
    }

    #[tracing::instrument(skip(self))]
    async fn grant(&self, ttl: i64) -> StoreResult<LeaseGrantResponse> {
        let mut state = self.state()?;
        if ttl > MAX_LEASE_TTL {
            return Err(StoreError::server(MSG_LEASE_TTL_TOO_LARGE));
        }
        let ttl = ttl.max(MIN_LEASE_TTL);
        let expires_at = lease_deadline(ttl)?;
        let id = state.next_lease_id;
        state.next_lease_id += 1;
        state.leases.insert(id, Lease { ttl, expires_at, keys: BTreeSet::new() });
        Ok(LeaseGrantResponse { header: state.header(), id, ttl })
    }

    #[tracing::instrument(skip(self))]
    async fn revoke(&self, id: LeaseId) -> StoreResult<LeaseRevokeResponse> {
        let mut state = self.state()?;
        state.revoke_lease(id)?;
        Ok(LeaseRevokeResponse { header: state.header() })
    }

    #[tracing::instrument(skip(self))]
    async fn keepalive(&self, id: LeaseId) -> StoreResult<LeaseKeepAliveResponse> {
        let mut state = self.state()?;
        let header = state.header();
        let lease = state.leases.get_mut(&id).ok_or(StoreError::LeaseNotFound { id })?;
        lease.expires_at = lease_deadline(lease.ttl)?;
        Ok(LeaseKeepAliveResponse { header, id, ttl: lease.ttl })
    }
}

#[async_trait]
impl StoreClient for MemoryClient {
    fn unix_socket_proxy(&self) -> Option<&str> {
        self.unix_socket_proxy.as_deref()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Hands out [`MemoryClient`]s on one [`MemoryStore`].
///
/// Every successful connection records the [`ClientConfig`] it was built
/// from and the client it produced, so tests can inspect routing decisions
/// and whether a client was closed.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
    connections: Arc<Mutex<Vec<(ClientConfig, MemoryClient)>>>,
    failure: Arc<Mutex<Option<StoreError>>>,
}

impl MemoryConnector {
    /// Creates a connector over `store`.
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self { store, connections: Arc::default(), failure: Arc::default() }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Makes every following `connect` fail with `error` until cleared.
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock() = Some(error);
    }

    /// Lets connections succeed again.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Returns the configurations of every successful connection, oldest first.
    #[must_use]
    pub fn connections(&self) -> Vec<ClientConfig> {
        self.connections.lock().iter().map(|(config, _)| config.clone()).collect()
    }

    /// Returns every client handed out, oldest first.
    #[must_use]
    pub fn clients(&self) -> Vec<MemoryClient> {
        self.connections.lock().iter().map(|(_, client)| client.clone()).collect()
    }
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("connections", &self.connections.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, config: &ClientConfig) -> StoreResult<Arc<dyn StoreClient>> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        let client = MemoryClient::new(self.store.clone(), config.unix_socket_proxy.clone());
        self.connections.lock().push((config.clone(), client.clone()));
        Ok(Arc::new(client))
    }
}
