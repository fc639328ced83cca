//! `discover`: list the DVRs advertising remote control over mDNS.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Local;
use owo_colors::OwoColorize;
use tabled::Tabled;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use tivoctl_core::{Device, DiscoveryRegistry};

use crate::cli::{DiscoverArgs, GlobalOpts, OutputFormat};
use crate::config::{Config, discovery_config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            name: d.name.clone(),
            address: d.address.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DiscoverArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    if args.duration == 0 && !args.watch {
        return Err(CliError::Validation {
            field: "duration".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let registry = DiscoveryRegistry::start(discovery_config(&cfg.defaults));
    let result = if args.watch {
        watch(&registry, global).await
    } else {
        scan(&registry, Duration::from_secs(args.duration), global).await
    };
    registry.stop();
    result
}

async fn scan(
    registry: &DiscoveryRegistry,
    duration: Duration,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bar = util::spinner(global, "Searching for DVRs");
    tokio::time::sleep(duration).await;
    bar.finish_and_clear();

    let format = global.output.unwrap_or_default();
    let devices = registry.snapshot();
    if devices.is_empty() && !global.quiet && format == OutputFormat::Table {
        eprintln!("No DVRs found. Is network remote control enabled?");
        return Ok(());
    }

    let out = output::render_list(
        format,
        devices.as_slice(),
        |d| DeviceRow::from(d),
        |d| d.address.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Report devices as they come and go until interrupted.
async fn watch(registry: &DiscoveryRegistry, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color.unwrap_or_default());
    let mut stream = registry.subscribe();
    let mut seen: HashSet<Device> = HashSet::new();

    let mut report = |snapshot: &[Device]| -> Result<(), CliError> {
        let current: HashSet<Device> = snapshot.iter().cloned().collect();
        for device in snapshot.iter().filter(|d| !seen.contains(*d)) {
            print_change(device, true, color, global)?;
        }
        for device in seen.difference(&current) {
            print_change(device, false, color, global)?;
        }
        seen = current;
        Ok(())
    };

    // Periodic re-scan alongside change notification.
    let mut refresh = tokio::time::interval(registry.config().refresh_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    report(stream.current().as_slice())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            snapshot = stream.changed() => match snapshot {
                Some(snapshot) => report(snapshot.as_slice())?,
                None => return Ok(()),
            },
            _ = refresh.tick() => {
                let snapshot = registry.snapshot();
                debug!(devices = snapshot.len(), "re-scan");
                report(snapshot.as_slice())?;
            }
        }
    }
}

fn print_change(
    device: &Device,
    added: bool,
    color: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let line = match global.output.unwrap_or_default() {
        OutputFormat::Table => {
            let stamp = Local::now().format("%H:%M:%S").to_string();
            match (added, color) {
                (true, true) => format!("{}  {} {device}", stamp.dimmed(), "+".green().bold()),
                (false, true) => format!("{}  {} {device}", stamp.dimmed(), "-".red().bold()),
                (true, false) => format!("{stamp}  + {device}"),
                (false, false) => format!("{stamp}  - {device}"),
            }
        }
        OutputFormat::Plain if added => device.address.clone(),
        OutputFormat::Plain => return Ok(()),
        _ => serde_json::to_string(&serde_json::json!({
            "received_at": Local::now(),
            "change": if added { "added" } else { "removed" },
            "device": device,
        }))
        .map_err(|e| CliError::Render(e.to_string()))?,
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
