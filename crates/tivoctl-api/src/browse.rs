//! mDNS browse loop with automatic restart.
//!
//! Browses the local network segment for appliances advertising the TiVo
//! remote service and broadcasts resolved/removed advertisements through a
//! [`tokio::sync::broadcast`] channel. Failures of the discovery substrate
//! (no usable interface, socket errors) are never fatal: the loop logs them
//! and restarts with exponential backoff + jitter until cancelled.
//!
//! # Example
//!
//! ```rust,ignore
//! use tivoctl_api::browse::{BrowseConfig, BrowseHandle, SERVICE_TYPE};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut handle = BrowseHandle::start(SERVICE_TYPE, BrowseConfig::default(), CancellationToken::new());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(adv) = rx.recv().await {
//!     println!("{adv:?}");
//! }
//!
//! handle.shutdown();
//! ```

use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Service type TiVos advertise their remote protocol under.
pub const SERVICE_TYPE: &str = "_tivo-mindrpc._tcp.local.";

const ADVERTISEMENT_CHANNEL_CAPACITY: usize = 256;

// ── Advertisement ────────────────────────────────────────────────────

/// A change observed on the network for the browsed service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advertisement {
    /// An instance resolved to one or more addresses.
    Resolved {
        /// Full service instance name, e.g. `Living Room._tivo-mindrpc._tcp.local.`
        fullname: String,
        addresses: Vec<IpAddr>,
    },
    /// An instance announced its departure (or its records expired).
    Removed { fullname: String },
}

// ── BrowseConfig ─────────────────────────────────────────────────────

/// Backoff configuration for restarting a failed browse.
#[derive(Debug, Clone)]
pub struct BrowseConfig {
    /// Delay before the first restart attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

// ── BrowseHandle ─────────────────────────────────────────────────────

/// Handle to a running browse loop.
///
/// Call [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`start`](Self::start)) to stop browsing and release the mDNS daemon.
pub struct BrowseHandle {
    event_tx: broadcast::Sender<Advertisement>,
    initial_rx: Option<broadcast::Receiver<Advertisement>>,
    cancel: CancellationToken,
}

impl BrowseHandle {
    /// Spawn the browse loop for `service_type`. Returns immediately;
    /// the first browse attempt happens on the spawned task.
    pub fn start(
        service_type: impl Into<String>,
        config: BrowseConfig,
        cancel: CancellationToken,
    ) -> Self {
        let service_type = service_type.into();
        let (event_tx, initial_rx) = broadcast::channel(ADVERTISEMENT_CHANNEL_CAPACITY);

        let task_tx = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            browse_loop(service_type, task_tx, config, task_cancel).await;
        });

        Self {
            event_tx,
            initial_rx: Some(initial_rx),
            cancel,
        }
    }

    /// Get a receiver for advertisements.
    ///
    /// The first call returns the receiver created before the loop was
    /// spawned, so nothing observed since [`start`](Self::start) is missed.
    /// Later calls only see advertisements sent after subscribing.
    pub fn subscribe(&mut self) -> broadcast::Receiver<Advertisement> {
        self.initial_rx
            .take()
            .unwrap_or_else(|| self.event_tx.subscribe())
    }

    /// Signal the background task to stop browsing.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background loop ──────────────────────────────────────────────────

/// Main loop: browse → on failure, backoff → browse again.
async fn browse_loop(
    service_type: String,
    event_tx: broadcast::Sender<Advertisement>,
    config: BrowseConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        match browse_once(&service_type, &event_tx, &cancel).await {
            Ok(()) if cancel.is_cancelled() => break,
            Ok(()) => {
                tracing::info!(service_type, "mDNS browse stopped, restarting");
                attempt = 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "mDNS browse failed");
            }
        }

        let delay = calculate_backoff(attempt, &config);
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before restarting browse"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!(service_type, "mDNS browse loop exiting");
}

/// Run one daemon + browse session until cancelled or the search stops.
///
/// Cancellation is handled in here rather than by dropping the future so
/// the daemon thread is always shut down.
async fn browse_once(
    service_type: &str,
    event_tx: &broadcast::Sender<Advertisement>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let daemon = ServiceDaemon::new()?;
    let receiver = match daemon.browse(service_type) {
        Ok(receiver) => receiver,
        Err(e) => {
            let _ = daemon.shutdown();
            return Err(e.into());
        }
    };

    tracing::info!(service_type, "browsing for appliances");

    let result = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            event = receiver.recv_async() => match event {
                Ok(ServiceEvent::SearchStopped(ty)) => {
                    tracing::debug!(service_type = %ty, "search stopped");
                    break Ok(());
                }
                Ok(event) => {
                    if let Some(adv) = to_advertisement(&event) {
                        tracing::debug!(?adv, "advertisement");
                        // No subscribers is fine; the registry may not be listening yet.
                        let _ = event_tx.send(adv);
                    } else {
                        tracing::trace!(?event, "ignored mDNS event");
                    }
                }
                Err(e) => break Err(Error::Discovery(e.to_string())),
            }
        }
    };

    if let Err(e) = daemon.stop_browse(service_type) {
        tracing::debug!(error = %e, "stop_browse failed");
    }
    if let Err(e) = daemon.shutdown() {
        tracing::debug!(error = %e, "mDNS daemon shutdown failed");
    }

    result
}

/// Translate a daemon event into an [`Advertisement`], if it is one.
fn to_advertisement(event: &ServiceEvent) -> Option<Advertisement> {
    match event {
        ServiceEvent::ServiceResolved(info) => {
            let mut addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
            addresses.sort();
            Some(Advertisement::Resolved {
                fullname: info.get_fullname().to_owned(),
                addresses,
            })
        }
        ServiceEvent::ServiceRemoved(_ty, fullname) => Some(Advertisement::Removed {
            fullname: fullname.clone(),
        }),
        _ => None,
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`, jitter within +-25%.
fn calculate_backoff(attempt: u32, config: &BrowseConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter": a function of the attempt number only, with
    // no random source. Every registry in the process restarts its browse
    // at the same moments for the same attempt.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
