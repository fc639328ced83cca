// tivoctl-core: protocol client, discovery registry and session handling
// between tivoctl-api and consumers (CLI).

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod session;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{ClientEvent, ConnectionState, ProtocolClient};
pub use config::{ClientConfig, DiscoveryConfig};
pub use discovery::{DiscoveryRegistry, display_name};
pub use error::CoreError;
pub use model::{ChannelChange, Device, RemoteButton};
pub use session::Session;
pub use stream::{DeviceStream, DeviceWatchStream, ResponseStream};

// Wire-level types consumers need without depending on tivoctl-api.
pub use tivoctl_api::{BrowseConfig, CommandRequest, DEFAULT_PORT, ResponseEvent, TransportConfig};
