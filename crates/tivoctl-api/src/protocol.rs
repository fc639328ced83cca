//! TiVo TCP remote protocol (v1.1) text encoding.
//!
//! Outgoing commands are single lines of space-separated tokens terminated by
//! one carriage return. Incoming lines are whitespace-trimmed, split on single
//! spaces and dispatched on the first token. The protocol carries no request
//! ids, so responses cannot be correlated with the command that caused them.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

/// Line terminator for every outgoing command.
pub const COMMAND_TERMINATOR: u8 = b'\r';

// ── Outgoing ─────────────────────────────────────────────────────────

/// A command the appliance understands.
///
/// `subchannel` uses `None` as the "omit" sentinel; `Some(0)` is treated the
/// same way. Channel numbers are not range-checked here: the appliance
/// rejects channels it does not carry with `CH_FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandRequest {
    /// Simulate an infrared remote button (`IRCODE <code>`).
    IrCode { code: String },
    /// Simulate a keyboard key (`KEYBOARD <code>`).
    Keyboard { code: String },
    /// Tune a channel unless a recording is in progress (`SETCH`).
    SetChannel { channel: u32, subchannel: Option<u32> },
    /// Tune a channel, cancelling any recording in progress (`FORCECH`).
    ForceChannel { channel: u32, subchannel: Option<u32> },
    /// Jump straight to a named screen (`TELEPORT <screen>`).
    Teleport { screen: String },
}

impl CommandRequest {
    pub fn ir_code(code: impl Into<String>) -> Self {
        Self::IrCode { code: code.into() }
    }

    pub fn keyboard(code: impl Into<String>) -> Self {
        Self::Keyboard { code: code.into() }
    }

    pub fn teleport(screen: impl Into<String>) -> Self {
        Self::Teleport {
            screen: screen.into(),
        }
    }

    pub fn set_channel(channel: u32, subchannel: Option<u32>) -> Self {
        Self::SetChannel {
            channel,
            subchannel,
        }
    }

    pub fn force_channel(channel: u32, subchannel: Option<u32>) -> Self {
        Self::ForceChannel {
            channel,
            subchannel,
        }
    }

    /// The protocol verb this command is sent with.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::IrCode { .. } => "IRCODE",
            Self::Keyboard { .. } => "KEYBOARD",
            Self::SetChannel { .. } => "SETCH",
            Self::ForceChannel { .. } => "FORCECH",
            Self::Teleport { .. } => "TELEPORT",
        }
    }

    /// Encoded command text, without the terminator.
    pub fn encode(&self) -> String {
        match self {
            Self::IrCode { code } | Self::Keyboard { code } => format!("{} {code}", self.verb()),
            Self::Teleport { screen } => format!("{} {screen}", self.verb()),
            Self::SetChannel {
                channel,
                subchannel,
            }
            | Self::ForceChannel {
                channel,
                subchannel,
            } => match subchannel {
                Some(sub) if *sub != 0 => format!("{} {channel} {sub}", self.verb()),
                _ => format!("{} {channel}", self.verb()),
            },
        }
    }

    /// Bytes as they go on the wire: encoded text plus one `\r`.
    pub fn to_wire(&self) -> Bytes {
        let text = self.encode();
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        buf.put_slice(text.as_bytes());
        buf.put_u8(COMMAND_TERMINATOR);
        buf.freeze()
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ── Incoming ─────────────────────────────────────────────────────────

/// One decoded line from the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// `CH_STATUS`: the tuner is now on `channel`; `source` says why
    /// (`LOCAL`, `REMOTE`, `RECORDING`, ...).
    ChannelChanged { channel: String, source: String },
    /// `CH_FAILED`: a channel change was refused.
    ChannelFailed { reason: String },
    /// Any line the client does not understand; carries the first token.
    GenericError { code: String },
    /// Informational lines that need no action (`LIVETV_READY`, ...).
    Acknowledged { kind: String },
}

impl ResponseEvent {
    /// `true` for events describing a failure (appliance- or protocol-level).
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ChannelFailed { .. } | Self::GenericError { .. })
    }
}

impl fmt::Display for ResponseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelChanged { channel, source } if source.is_empty() => {
                write!(f, "channel {channel}")
            }
            Self::ChannelChanged { channel, source } => write!(f, "channel {channel} ({source})"),
            Self::ChannelFailed { reason } => write!(f, "channel change failed: {reason}"),
            Self::GenericError { code } => write!(f, "error: {code}"),
            Self::Acknowledged { kind } => f.write_str(kind),
        }
    }
}

/// Parse one protocol line into an event.
///
/// Returns `None` for blank lines. Never fails otherwise: anything that
/// cannot be routed degrades to [`ResponseEvent::GenericError`].
pub fn parse_line(line: &str) -> Option<ResponseEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut tokens = line.split(' ');
    let verb = tokens.next().unwrap_or_default();
    let rest: Vec<&str> = tokens.collect();

    let event = match (verb, rest.as_slice()) {
        ("CH_STATUS", [channel]) => ResponseEvent::ChannelChanged {
            channel: (*channel).to_string(),
            source: String::new(),
        },
        ("CH_STATUS", [channel, source]) | ("CH_STATUS", [channel, _, source, ..]) => {
            ResponseEvent::ChannelChanged {
                channel: (*channel).to_string(),
                source: (*source).to_string(),
            }
        }
        ("CH_FAILED", [reason, ..]) => ResponseEvent::ChannelFailed {
            reason: (*reason).to_string(),
        },
        ("LIVETV_READY" | "MISSING_TELEPORT_NAME", _) => ResponseEvent::Acknowledged {
            kind: verb.to_string(),
        },
        _ => ResponseEvent::GenericError {
            code: verb.to_string(),
        },
    };

    Some(event)
}

// ── Tests ────────────────────────────────────────────────────────────
