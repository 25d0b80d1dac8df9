//! Watch subscriptions.
//!
//! A [`WatchStream`] yields [`WatchResponse`] batches in revision order
//! until the producing client drops its [`WatchSender`] or the store
//! cancels the watch.

use tokio::sync::mpsc;

use crate::types::WatchResponse;

/// Producer half of a watch subscription, held by the client implementation.
#[derive(Debug, Clone)]
pub struct WatchSender {
    tx: mpsc::UnboundedSender<WatchResponse>,
}

impl WatchSender {
    /// Delivers a batch. Returns `false` once the consumer has gone away.
    pub fn send(&self, response: WatchResponse) -> bool {
        self.tx.send(response).is_ok()
    }

    /// Returns `true` once the consumer has dropped its stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a watch subscription.
#[derive(Debug)]
pub struct WatchStream {
    rx: mpsc::UnboundedReceiver<WatchResponse>,
}

impl WatchStream {
    /// Creates a connected sender/stream pair.
    #[must_use]
    pub fn channel() -> (WatchSender, WatchStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WatchSender { tx }, WatchStream { rx })
    }

    /// Waits for the next batch. Returns `None` when the watch has ended.
    pub async fn next(&mut self) -> Option<WatchResponse> {
        self.rx.recv().await
    }

    /// Returns the next batch if one is already buffered.
    pub fn try_next(&mut self) -> Option<WatchResponse> {
        self.rx.try_recv().ok()
    }
}
