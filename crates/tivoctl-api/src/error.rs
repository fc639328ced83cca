use std::io;

use thiserror::Error;

/// Top-level error type for the `tivoctl-api` crate.
///
/// Covers the transport (TCP connect, socket I/O) and the discovery
/// substrate (mDNS daemon). `tivoctl-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The address could not be used to open a connection at all.
    #[error("Invalid appliance address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// TCP connect failed (refused, unreachable, DNS failure, ...).
    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("Connecting to {address} timed out after {timeout_secs}s")]
    ConnectTimeout { address: String, timeout_secs: u64 },

    /// Socket read/write error on an established connection.
    #[error("Socket error: {0}")]
    Io(#[from] io::Error),

    // ── Discovery ───────────────────────────────────────────────────
    /// The mDNS daemon could not be started or refused a browse request.
    #[error("mDNS discovery error: {0}")]
    Discovery(String),
}

impl Error {
    /// Returns `true` if the failure is worth retrying from a fresh
    /// connection attempt (the protocol client itself never retries).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectTimeout { .. } | Self::Discovery(_) => true,
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<mdns_sd::Error> for Error {
    fn from(err: mdns_sd::Error) -> Self {
        Self::Discovery(err.to_string())
    }
}
