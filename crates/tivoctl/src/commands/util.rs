//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use tivoctl_core::{ClientEvent, CoreError, ResponseStream, Session};

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;

/// How long to listen for an immediate refusal after sending.
const SETTLE: Duration = Duration::from_millis(300);

/// A stderr spinner, hidden in quiet mode or when stderr is not a terminal.
pub fn spinner(global: &GlobalOpts, message: impl Into<String>) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Open a session to the target and wait until it is usable.
pub async fn connect(
    global: &GlobalOpts,
    target: Target,
) -> Result<(Session, ResponseStream), CliError> {
    let bar = spinner(global, format!("Connecting to {}", target.device));
    let mut session = Session::new(target.client);
    let responses = session.connect(target.device).await?;
    let connected = session.wait_connected().await;
    bar.finish_and_clear();
    connected?;
    Ok((session, responses))
}

/// Listen briefly for a refusal of what was just sent.
///
/// The appliance never acknowledges a successful key press, so silence
/// within the settle window counts as success.
pub async fn settle(responses: &mut ResponseStream) -> Result<(), CliError> {
    let deadline = tokio::time::sleep(SETTLE);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => return Ok(()),
            event = responses.next_event() => match event {
                Some(ClientEvent::Response(response)) => {
                    if let Some(err) = CoreError::from_response(&response) {
                        return Err(err.into());
                    }
                    debug!(%response, "appliance status");
                }
                Some(ClientEvent::ConnectionError { reason }) => {
                    return Err(CliError::ConnectionLost { reason });
                }
                None => return Ok(()),
            },
        }
    }
}

/// Normalize a raw protocol code: one token, uppercase.
pub fn protocol_code(field: &str, code: &str) -> Result<String, CliError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must not be empty".into(),
        });
    }
    if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("'{code}' must be a single word"),
        });
    }
    Ok(code.to_ascii_uppercase())
}
