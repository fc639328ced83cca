//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tivoctl_config::ConfigError;
use tivoctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const APPLIANCE: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {address}: {reason}")]
    #[diagnostic(
        code(tivoctl::connection_failed),
        help(
            "Check that the DVR is powered on and reachable, and that\n\
             Settings > Remote, CableCARD & Receivers > Network Remote Control\n\
             is enabled. Try: tivoctl discover"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection lost: {reason}")]
    #[diagnostic(code(tivoctl::connection_lost))]
    ConnectionLost { reason: String },

    #[error("Only {written} of {expected} bytes of '{command}' were sent")]
    #[diagnostic(
        code(tivoctl::partial_write),
        help("The connection was dropped because the DVR could not accept the whole command.")
    )]
    PartialWrite {
        command: String,
        written: usize,
        expected: usize,
    },

    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(tivoctl::timeout),
        help("Increase the timeout with --timeout or check the DVR is responsive.")
    )]
    Timeout { seconds: u64 },

    // ── Appliance ────────────────────────────────────────────────────
    #[error("The DVR refused the request: {reason}")]
    #[diagnostic(code(tivoctl::appliance_rejected))]
    ApplianceRejected { reason: String },

    #[error("The DVR reported an error: {code}")]
    #[diagnostic(code(tivoctl::protocol))]
    Protocol { code: String },

    // ── Discovery ────────────────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    #[diagnostic(
        code(tivoctl::discovery),
        help("mDNS needs multicast on the local network. Address the DVR directly with --address.")
    )]
    Discovery { message: String },

    // ── Target selection ─────────────────────────────────────────────
    #[error("No DVR selected")]
    #[diagnostic(
        code(tivoctl::no_target),
        help(
            "Pass --address <host>, or save one with: tivoctl config add <name> <host> --default\n\
             Find DVRs with: tivoctl discover"
        )
    )]
    NoTarget,

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tivoctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: tivoctl config add {name} <host>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Unknown button '{name}'")]
    #[diagnostic(
        code(tivoctl::unknown_button),
        help("Run: tivoctl buttons to see the buttons `press` understands")
    )]
    UnknownButton { name: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tivoctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(tivoctl::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(tivoctl::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(tivoctl::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::ConnectionLost { .. }
            | Self::PartialWrite { .. }
            | Self::Discovery { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ApplianceRejected { .. } | Self::Protocol { .. } => exit_code::APPLIANCE,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::NoTarget | Self::UnknownButton { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::Config(_) | Self::Io(_) | Self::Render(_) | Self::Internal(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── Conversion from CoreError ────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { address, reason } => {
                CliError::ConnectionFailed { address, reason }
            }
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::PartialWrite {
                command,
                written,
                expected,
            } => CliError::PartialWrite {
                command,
                written,
                expected,
            },
            CoreError::NotConnected { state } => CliError::ConnectionLost {
                reason: format!("connection is {state}"),
            },
            CoreError::Protocol { code } => CliError::Protocol { code },
            CoreError::Appliance { reason } => CliError::ApplianceRejected { reason },
            CoreError::Discovery { message } => CliError::Discovery { message },
            CoreError::Config { message } => CliError::Validation {
                field: "address".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── Conversion from ConfigError ──────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: tivoctl config show)".into(),
            },
            ConfigError::Serialization(e) => CliError::Render(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
