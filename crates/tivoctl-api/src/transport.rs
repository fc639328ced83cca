// TCP transport configuration and connection setup.
//
// TiVos always serve the remote protocol on port 31339. The port is kept
// configurable only so tests can run against a loopback listener.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::Error;

/// Port the appliance serves the remote protocol on.
pub const DEFAULT_PORT: u16 = 31339;

/// Shared transport configuration for protocol connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    /// Disable Nagle so single-key presses go out immediately.
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
        }
    }
}

impl TransportConfig {
    /// Open a TCP stream to `address` on the configured port.
    ///
    /// `address` is a host name or IP literal without a port. IPv6
    /// literals may be given bare or in brackets.
    pub async fn connect(&self, address: &str) -> Result<TcpStream, Error> {
        let host = address.trim();
        if host.is_empty() {
            return Err(Error::InvalidAddress {
                address: address.into(),
                reason: "address is empty".into(),
            });
        }

        let host = host.trim_start_matches('[').trim_end_matches(']');
        tracing::debug!(host, port = self.port, "connecting to appliance");

        let connect = TcpStream::connect((host, self.port));
        let stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| Error::ConnectTimeout {
                address: address.into(),
                timeout_secs: self.connect_timeout.as_secs(),
            })?
            .map_err(|source| Error::Connect {
                address: address.into(),
                source,
            })?;

        if self.nodelay {
            stream.set_nodelay(true)?;
        }

        tracing::info!(host, port = self.port, "connected to appliance");
        Ok(stream)
    }
}
