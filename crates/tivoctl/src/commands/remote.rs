//! Remote-control command handlers: buttons, raw codes, teleports and
//! channel changes.

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use strum::IntoEnumIterator;
use tabled::Tabled;
use tracing::debug;

use tivoctl_core::{
    ChannelChange, ClientEvent, CommandRequest, CoreError, RemoteButton, ResponseEvent,
    ResponseStream,
};

use crate::cli::{ChannelArgs, CodeArgs, GlobalOpts, PressArgs, TeleportArgs};
use crate::config::Target;
use crate::error::CliError;
use crate::output;

use super::util;

// ── buttons ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ButtonInfo {
    name: &'static str,
    command: String,
}

#[derive(Tabled)]
struct ButtonRow {
    #[tabled(rename = "Button")]
    name: &'static str,
    #[tabled(rename = "Sends")]
    command: String,
}

pub fn list_buttons(global: &GlobalOpts) -> Result<(), CliError> {
    let buttons: Vec<ButtonInfo> = RemoteButton::iter()
        .map(|b| ButtonInfo {
            name: b.into(),
            command: b.request().encode(),
        })
        .collect();

    let out = output::render_list(
        global.output.unwrap_or_default(),
        &buttons,
        |b| ButtonRow {
            name: b.name,
            command: b.command.clone(),
        },
        |b| b.name.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── press ────────────────────────────────────────────────────────────

pub fn parse_buttons(names: &[String]) -> Result<Vec<RemoteButton>, CliError> {
    names
        .iter()
        .map(|name| {
            RemoteButton::from_str(name.trim())
                .map_err(|_| CliError::UnknownButton { name: name.clone() })
        })
        .collect()
}

pub async fn press(args: PressArgs, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    // Reject typos before touching the network.
    let buttons = parse_buttons(&args.buttons)?;
    let delay = Duration::from_millis(args.delay);

    let (mut session, mut responses) = util::connect(global, target).await?;
    let result: Result<(), CliError> = async {
        for (i, button) in buttons.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            session.press(*button).await?;
            debug!(%button, "pressed");
        }
        util::settle(&mut responses).await
    }
    .await;
    session.disconnect().await;
    result?;

    if !global.quiet {
        eprintln!("Pressed {}", args.buttons.join(" "));
    }
    Ok(())
}

// ── ir / keyboard / teleport ─────────────────────────────────────────

pub async fn ir(args: CodeArgs, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let request = CommandRequest::ir_code(util::protocol_code("code", &args.code)?);
    send_one(&request, target, global).await
}

pub async fn keyboard(args: CodeArgs, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let request = CommandRequest::keyboard(util::protocol_code("code", &args.code)?);
    send_one(&request, target, global).await
}

pub async fn teleport(
    args: TeleportArgs,
    target: Target,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let request = CommandRequest::teleport(util::protocol_code("screen", &args.screen)?);
    send_one(&request, target, global).await
}

async fn send_one(
    request: &CommandRequest,
    target: Target,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (mut session, mut responses) = util::connect(global, target).await?;
    let result: Result<(), CliError> = async {
        session.send(request).await?;
        util::settle(&mut responses).await
    }
    .await;
    session.disconnect().await;
    result?;

    if !global.quiet {
        eprintln!("Sent {request}");
    }
    Ok(())
}

// ── channel ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChannelStatus {
    channel: String,
    source: String,
}

pub async fn channel(
    args: ChannelArgs,
    target: Target,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let change = ChannelChange {
        channel: args.channel,
        subchannel: args.subchannel,
        stop_recording: args.force,
    };
    let wait_for = target.client.timeout();

    let (mut session, mut responses) = util::connect(global, target).await?;
    let result: Result<Option<ChannelStatus>, CliError> = async {
        session.change_channel(change).await?;
        if args.wait {
            let status = tokio::time::timeout(wait_for, confirm_channel(&mut responses, change))
                .await
                .map_err(|_| CliError::Timeout {
                    seconds: wait_for.as_secs(),
                })??;
            Ok(Some(status))
        } else {
            util::settle(&mut responses).await.map(|()| None)
        }
    }
    .await;
    session.disconnect().await;

    match result? {
        Some(status) => {
            let out = output::render_single(
                global.output.unwrap_or_default(),
                &status,
                |s| {
                    if s.source.is_empty() {
                        format!("Now on channel {}", s.channel)
                    } else {
                        format!("Now on channel {} ({})", s.channel, s.source)
                    }
                },
                |s| s.channel.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }
        None if !global.quiet => eprintln!("Sent {}", change.into_request()),
        None => {}
    }
    Ok(())
}

/// Wait for the appliance to report the requested channel, or refuse it.
///
/// Status lines for other channels (the appliance reports the current
/// channel when a client connects) are skipped.
async fn confirm_channel(
    responses: &mut ResponseStream,
    change: ChannelChange,
) -> Result<ChannelStatus, CliError> {
    while let Some(event) = responses.next_event().await {
        match event {
            ClientEvent::Response(ResponseEvent::ChannelChanged { channel, source }) => {
                if reports_channel(&channel, change.channel) {
                    return Ok(ChannelStatus { channel, source });
                }
                debug!(%channel, "status for another channel");
            }
            ClientEvent::Response(response) => {
                if let Some(err) = CoreError::from_response(&response) {
                    return Err(err.into());
                }
            }
            ClientEvent::ConnectionError { reason } => {
                return Err(CliError::ConnectionLost { reason });
            }
        }
    }
    Err(CliError::ConnectionLost {
        reason: "connection closed before the change was confirmed".into(),
    })
}

/// `CH_STATUS` pads channel numbers (`0042`); compare numerically.
fn reports_channel(reported: &str, requested: u32) -> bool {
    reported
        .split('-')
        .next()
        .and_then(|n| n.parse::<u32>().ok())
        .is_some_and(|n| n == requested)
}
