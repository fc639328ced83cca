// ── Runtime configuration ──
//
// These types describe *how* to talk to appliances and how to discover them.
// They never touch disk: the CLI builds them (usually from tivoctl-config)
// and hands them in.

use std::time::Duration;

use tivoctl_api::{BrowseConfig, SERVICE_TYPE, TransportConfig};

/// Configuration for one protocol connection.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Connection timeout, as configured on the transport.
    pub fn timeout(&self) -> Duration {
        self.transport.connect_timeout
    }
}

/// Configuration for a [`DiscoveryRegistry`](crate::DiscoveryRegistry).
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// mDNS service type to browse.
    pub service_type: String,
    /// Record IPv6 addresses as well as IPv4 ones.
    pub include_ipv6: bool,
    /// Evict devices when their advertisement is withdrawn. When `false`
    /// (the default) a device stays listed until the registry is dropped.
    pub evict_on_removal: bool,
    /// Restart backoff for the browse loop.
    pub browse: BrowseConfig,
    /// How often presentation layers should re-read the snapshot.
    pub refresh_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: SERVICE_TYPE.to_owned(),
            include_ipv6: false,
            evict_on_removal: false,
            browse: BrowseConfig::default(),
            refresh_interval: Duration::from_secs(5),
        }
    }
}
