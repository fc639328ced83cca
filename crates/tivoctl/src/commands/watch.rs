//! `watch`: print everything the DVR reports until interrupted.

use chrono::Local;
use tracing::info;

use tivoctl_core::ClientEvent;

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let format = global.output.unwrap_or_default();
    let color = output::should_color(global.color.unwrap_or_default());
    let device = target.device.clone();
    let (mut session, mut responses) = util::connect(global, target).await?;
    info!(%device, "watching");
    if !global.quiet {
        eprintln!("Watching {device}, press Ctrl-C to stop");
    }

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = responses.next_event() => {
                let Some(event) = event else {
                    if !global.quiet {
                        eprintln!("Connection closed by {device}");
                    }
                    break Ok(());
                };
                let line = output::render_event(format, &event, Local::now(), color)?;
                output::print_output(&line, global.quiet);
                if let ClientEvent::ConnectionError { reason } = event {
                    break Err(CliError::ConnectionLost { reason });
                }
            }
        }
    };

    session.disconnect().await;
    result
}
