// ── Discovery registry ──
//
// Keeps the set of appliances advertised on the local network. Fed by the
// mDNS browse loop from tivoctl-api, or by hand through `record_*`/`apply`.

mod store;

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tivoctl_api::{Advertisement, BrowseHandle};

use crate::config::DiscoveryConfig;
use crate::model::Device;
use crate::stream::DeviceStream;

use store::DeviceStore;

/// Deduplicated, observable list of discovered appliances.
///
/// Readers get immutable snapshots, so iterating one is safe while
/// discovery keeps running. A device is identified by its
/// `(name, address)` pair; an appliance with two addresses shows up twice.
///
/// By default devices are never evicted: a withdrawn advertisement is
/// logged and ignored. Set [`DiscoveryConfig::evict_on_removal`] to drop
/// them instead.
pub struct DiscoveryRegistry {
    inner: Arc<RegistryInner>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct RegistryInner {
    config: DiscoveryConfig,
    store: DeviceStore,
}

impl DiscoveryRegistry {
    /// Create an idle registry. Nothing is discovered until advertisements
    /// are fed in with [`apply`](Self::apply) or the `record_*` methods.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                store: DeviceStore::new(),
            }),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Create a registry and start browsing in the background.
    ///
    /// Returns immediately. Network trouble never surfaces here: the
    /// browse loop keeps retrying and the snapshot simply stays empty.
    pub fn start(config: DiscoveryConfig) -> Self {
        let mut registry = Self::new(config);

        let mut browse = BrowseHandle::start(
            registry.inner.config.service_type.clone(),
            registry.inner.config.browse.clone(),
            registry.cancel.child_token(),
        );
        let advertisements = browse.subscribe();

        registry.task = Some(tokio::spawn(listen(
            Arc::clone(&registry.inner),
            advertisements,
            browse,
            registry.cancel.clone(),
        )));

        info!(
            service_type = %registry.inner.config.service_type,
            "discovery started"
        );
        registry
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.inner.config
    }

    /// Current devices, in discovery order.
    pub fn snapshot(&self) -> Arc<Vec<Device>> {
        self.inner.store.snapshot()
    }

    /// Subscribe to changes. Each mutation yields a new snapshot.
    pub fn subscribe(&self) -> DeviceStream {
        DeviceStream::new(self.inner.store.subscribe())
    }

    /// Record a resolved advertisement. Returns the number of new devices.
    pub fn record_resolved(&self, fullname: &str, addresses: &[IpAddr]) -> usize {
        self.inner.record_resolved(fullname, addresses)
    }

    /// Record a withdrawn advertisement. Returns the number of devices
    /// evicted (always 0 unless eviction is enabled).
    pub fn record_removed(&self, fullname: &str) -> usize {
        self.inner.record_removed(fullname)
    }

    /// Feed one advertisement from any discovery source.
    pub fn apply(&self, advertisement: &Advertisement) {
        self.inner.apply(advertisement);
    }

    /// `true` while the background listener is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop browsing. The snapshot stays readable.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for DiscoveryRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl RegistryInner {
    fn record_resolved(&self, fullname: &str, addresses: &[IpAddr]) -> usize {
        let name = display_name(fullname, &self.config.service_type);
        let mut added = 0;

        for address in addresses {
            if address.is_ipv6() && !self.config.include_ipv6 {
                continue;
            }
            let device = Device::new(name.clone(), address.to_string());
            if self.store.insert(device) {
                info!(name = %name, %address, "discovered appliance");
                added += 1;
            }
        }
        added
    }

    fn record_removed(&self, fullname: &str) -> usize {
        let name = display_name(fullname, &self.config.service_type);
        if !self.config.evict_on_removal {
            debug!(name = %name, "advertisement withdrawn, keeping device");
            return 0;
        }

        let removed = self.store.remove_named(&name);
        if removed > 0 {
            info!(name = %name, removed, "appliance left the network");
        }
        removed
    }

    fn apply(&self, advertisement: &Advertisement) {
        match advertisement {
            Advertisement::Resolved {
                fullname,
                addresses,
            } => {
                self.record_resolved(fullname, addresses);
            }
            Advertisement::Removed { fullname } => {
                self.record_removed(fullname);
            }
        }
    }
}

async fn listen(
    inner: Arc<RegistryInner>,
    mut advertisements: broadcast::Receiver<Advertisement>,
    browse: BrowseHandle,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            adv = advertisements.recv() => match adv {
                Ok(adv) => inner.apply(&adv),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "discovery listener lagged, advertisements dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    browse.shutdown();
    debug!("discovery listener stopped");
}

/// The user-facing part of a service instance name.
///
/// `Living Room._tivo-mindrpc._tcp.local.` becomes `Living Room`. Names
/// that do not end in `service_type` are returned as they are.
pub fn display_name(fullname: &str, service_type: &str) -> String {
    let ty = service_type.trim_end_matches('.');
    let full = fullname.trim_end_matches('.');

    match full.strip_suffix(ty).and_then(|rest| rest.strip_suffix('.')) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => fullname.to_owned(),
    }
}
