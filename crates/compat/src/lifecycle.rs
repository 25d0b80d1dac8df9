//! Process-phase-aware ownership of the store client.
//!
//! The process starts in [`ProcessPhase::Bootstrap`], before the config
//! server is listening. Clients built then connect directly and are only
//! good for that phase. [`ClientLifecycleManager::begin_serving`] moves the
//! process to [`ProcessPhase::Serving`]; from then on a single steady client
//! is built (through the config server when configured, directly when its
//! socket is missing) and shared by every caller.
//!
//! ```text
//!               handle()                     begin_serving() / handle()
//! Uninitialized ────────► Bootstrap(handle) ─────────────────────────────┐
//!       │                                                                 │
//!       └───────── handle() in Serving ─────────► Steady(handle) ◄────────┘
//!                                                       │
//!                                               invalidate()
//!                                                       ▼
//!                                                 Uninitialized
//! ```

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use tokio::sync::Mutex;

use crate::{
    error::Result,
    factory::{ClientFactory, ClientHandle, Routing},
};

/// Which phase the process is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessPhase {
    /// Start-up, before the config server accepts connections.
    Bootstrap,
    /// Request serving.
    Serving,
}

/// What the manager currently caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Nothing cached.
    Uninitialized,
    /// A direct client built during bootstrap.
    Bootstrap,
    /// The shared steady-state client.
    Steady,
}

enum Slot {
    Uninitialized,
    Bootstrap(ClientHandle),
    Steady(ClientHandle),
}

/// Owns the process's store client across phases.
pub struct ClientLifecycleManager {
    factory: ClientFactory,
    serving: AtomicBool,
    slot: Mutex<Slot>,
}

impl ClientLifecycleManager {
    /// Creates a manager in the bootstrap phase.
    #[must_use]
    pub fn new(factory: ClientFactory) -> Self {
        Self { factory, serving: AtomicBool::new(false), slot: Mutex::new(Slot::Uninitialized) }
    }

    /// Returns the factory clients are built with.
    #[must_use]
    pub fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> ProcessPhase {
        if self.serving.load(Ordering::Acquire) {
            ProcessPhase::Serving
        } else {
            ProcessPhase::Bootstrap
        }
    }

    /// Returns what is currently cached.
    pub async fn state(&self) -> HandleState {
        match &*self.slot.lock().await {
            Slot::Uninitialized => HandleState::Uninitialized,
            Slot::Bootstrap(_) => HandleState::Bootstrap,
            Slot::Steady(_) => HandleState::Steady,
        }
    }

    /// Enters the serving phase and closes any bootstrap client.
    ///
    /// Calling this more than once has no further effect.
    pub async fn begin_serving(&self) {
        if self.serving.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("entering serving phase");

        let mut slot = self.slot.lock().await;
        if matches!(*slot, Slot::Bootstrap(_))
            && let Slot::Bootstrap(handle) = std::mem::replace(&mut *slot, Slot::Uninitialized)
        {
            handle.client().close().await;
            tracing::debug!("closed bootstrap client");
        }
    }

    /// Returns a live client for the current phase.
    ///
    /// # Errors
    ///
    /// Returns the factory's error if a client has to be built and cannot be.
    #[tracing::instrument(skip(self))]
    pub async fn handle(&self) -> Result<ClientHandle> {
        let mut slot = self.slot.lock().await;
        let phase = self.phase();

        match &*slot {
            Slot::Bootstrap(handle) if phase == ProcessPhase::Bootstrap => {
                return Ok(handle.clone());
            },
            Slot::Steady(handle) if phase == ProcessPhase::Serving => return Ok(handle.clone()),
            _ => {},
        }

        if phase == ProcessPhase::Bootstrap {
            let handle = self.factory.build(Routing::Direct).await?;
            tracing::debug!("created bootstrap client");
            *slot = Slot::Bootstrap(handle.clone());
            return Ok(handle);
        }

        if let Slot::Bootstrap(stale) = std::mem::replace(&mut *slot, Slot::Uninitialized) {
            stale.client().close().await;
            tracing::debug!("discarded bootstrap client");
        }

        let handle = self.build_steady(None).await?;
        tracing::debug!(proxied = handle.proxy_socket_path().is_some(), "created steady client");
        *slot = Slot::Steady(handle.clone());
        Ok(handle)
    }

    /// Builds an uncached client for a long-lived consumer such as a watcher.
    ///
    /// The handle follows the same routing rules as the steady client but
    /// is owned by the caller, who is responsible for closing it.
    ///
    /// # Errors
    ///
    /// Returns the factory's error.
    pub async fn dedicated_handle(&self, timeout: Option<Duration>) -> Result<ClientHandle> {
        match self.phase() {
            ProcessPhase::Bootstrap => {
                self.factory.build_with_timeout(Routing::Direct, timeout).await
            },
            ProcessPhase::Serving => self.build_steady(timeout).await,
        }
    }

    /// Closes and forgets the cached client; the next [`handle`](Self::handle)
    /// builds a fresh one.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        match std::mem::replace(&mut *slot, Slot::Uninitialized) {
            Slot::Bootstrap(handle) | Slot::Steady(handle) => handle.client().close().await,
            Slot::Uninitialized => {},
        }
    }

    async fn build_steady(&self, timeout: Option<Duration>) -> Result<ClientHandle> {
        let handle = self.factory.build_with_timeout(Routing::Proxied, timeout).await?;

        if let Some(socket) = handle.proxy_socket_path()
            && !socket.exists()
        {
            tracing::warn!(
                socket = %socket.display(),
                "config server socket not found, connecting to etcd directly"
            );
            handle.client().close().await;
            return self.factory.build_with_timeout(Routing::Direct, timeout).await;
        }

        Ok(handle)
    }
}

impl std::fmt::Debug for ClientLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLifecycleManager")
            .field("phase", &self.phase())
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}
