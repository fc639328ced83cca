// ── Device set ──
//
// Insertion-ordered, identity-deduplicated device list. Every mutation
// publishes a fresh immutable snapshot through a `watch` channel; no-op
// mutations publish nothing.

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::Device;

pub(crate) struct DeviceStore {
    snapshot: watch::Sender<Arc<Vec<Device>>>,
}

impl DeviceStore {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self { snapshot }
    }

    /// Insert `device` unless the exact `(name, address)` pair is already
    /// present. Returns `true` if it was new.
    pub(crate) fn insert(&self, device: Device) -> bool {
        // `send_if_modified` updates even with zero receivers.
        self.snapshot.send_if_modified(|snap| {
            if snap.contains(&device) {
                return false;
            }
            let mut next = Vec::with_capacity(snap.len() + 1);
            next.extend(snap.iter().cloned());
            next.push(device);
            *snap = Arc::new(next);
            true
        })
    }

    /// Remove every device called `name`. Returns how many were removed.
    pub(crate) fn remove_named(&self, name: &str) -> usize {
        let mut removed = 0;
        self.snapshot.send_if_modified(|snap| {
            let next: Vec<Device> = snap.iter().filter(|d| d.name != name).cloned().collect();
            removed = snap.len() - next.len();
            if removed == 0 {
                return false;
            }
            *snap = Arc::new(next);
            true
        });
        removed
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Device>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Device>>> {
        self.snapshot.subscribe()
    }
}
