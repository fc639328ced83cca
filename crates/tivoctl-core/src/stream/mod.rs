// ── Reactive streams ──
//
// Subscription types handed to presentation layers: the per-client
// response stream and the discovery snapshot stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};

use crate::client::ClientEvent;
use crate::model::Device;

// ── ResponseStream ───────────────────────────────────────────────────

/// Everything one [`ProtocolClient`](crate::ProtocolClient) receives, in
/// arrival order. Ends when the connection closes or fails.
pub struct ResponseStream {
    inner: UnboundedReceiverStream<ClientEvent>,
}

impl ResponseStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<ClientEvent>) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(receiver),
        }
    }

    /// Wait for the next event. `None` once the connection is over.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.inner.next().await
    }
}

impl Stream for ResponseStream {
    type Item = ClientEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ── DeviceStream ─────────────────────────────────────────────────────

/// Follows the list of DVRs a [`DiscoveryRegistry`](crate::DiscoveryRegistry)
/// has found. Each list is a complete, deduplicated set; a DVR that
/// disappears from one list has been evicted.
///
/// Holding a `DeviceStream` does not keep the registry running.
pub struct DeviceStream {
    current: Arc<Vec<Device>>,
    receiver: watch::Receiver<Arc<Vec<Device>>>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Device>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// DVRs known when this subscription last looked: at creation, or at
    /// the most recent [`changed`](Self::changed).
    pub fn current(&self) -> &Arc<Vec<Device>> {
        &self.current
    }

    /// What the registry holds right now, without marking it seen.
    pub fn latest(&self) -> Arc<Vec<Device>> {
        self.receiver.borrow().clone()
    }

    /// Resolves when a DVR is added or evicted. `None` after the registry
    /// is gone. Several changes between polls collapse into one list.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Device>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Yield the device list as a `Stream`, starting with the one the
    /// registry holds now.
    pub fn into_stream(self) -> DeviceWatchStream {
        DeviceWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// Device lists from [`DeviceStream::into_stream`].
pub struct DeviceWatchStream {
    inner: WatchStream<Arc<Vec<Device>>>,
}

impl Stream for DeviceWatchStream {
    type Item = Arc<Vec<Device>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
