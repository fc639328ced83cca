// ── Core error types ──
//
// User-facing errors from tivoctl-core. Consumers never see raw socket or
// mDNS daemon errors; the `From<tivoctl_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;
use tivoctl_api::ResponseEvent;

use crate::client::ConnectionState;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Fewer bytes were accepted by the socket than the command encodes to.
    /// Framing is now unknown, so the connection is unusable.
    #[error("Partial write of '{command}': {written} of {expected} bytes sent")]
    PartialWrite {
        command: String,
        written: usize,
        expected: usize,
    },

    #[error("Not connected (connection is {state})")]
    NotConnected { state: ConnectionState },

    // ── Appliance-reported errors ────────────────────────────────────
    /// A response line the client could not route.
    #[error("Protocol error: {code}")]
    Protocol { code: String },

    /// The appliance refused a request, e.g. an invalid channel.
    #[error("Appliance refused request: {reason}")]
    Appliance { reason: String },

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Classify an appliance-reported failure.
    ///
    /// Returns `None` for informational events.
    pub fn from_response(event: &ResponseEvent) -> Option<Self> {
        match event {
            ResponseEvent::ChannelFailed { reason } => Some(Self::Appliance {
                reason: reason.clone(),
            }),
            ResponseEvent::GenericError { code } => Some(Self::Protocol { code: code.clone() }),
            ResponseEvent::ChannelChanged { .. } | ResponseEvent::Acknowledged { .. } => None,
        }
    }

    /// `true` if the error means the connection itself is gone.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::PartialWrite { .. }
                | Self::NotConnected { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tivoctl_api::Error> for CoreError {
    fn from(err: tivoctl_api::Error) -> Self {
        match err {
            tivoctl_api::Error::InvalidAddress { address, reason } => CoreError::Config {
                message: format!("invalid address '{address}': {reason}"),
            },
            tivoctl_api::Error::Connect { address, source } => CoreError::ConnectionFailed {
                address,
                reason: source.to_string(),
            },
            tivoctl_api::Error::ConnectTimeout { timeout_secs, .. } => {
                CoreError::Timeout { timeout_secs }
            }
            tivoctl_api::Error::Io(e) => CoreError::ConnectionFailed {
                address: String::new(),
                reason: e.to_string(),
            },
            tivoctl_api::Error::Discovery(message) => CoreError::Discovery { message },
        }
    }
}
