//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.
//! Streamed appliance events render one line each.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use tivoctl_core::ClientEvent;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color ────────────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact` / `yaml`: serializes the data via serde
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Plain => Ok(data.iter().map(id_fn).collect::<Vec<_>>().join("\n")),
        structured => render_structured(structured, data),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table output uses `detail_fn`, a pre-formatted detail view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Plain => Ok(id_fn(data)),
        structured => render_structured(structured, data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_structured<T: Serialize + ?Sized>(
    format: OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(render_err)?,
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(render_err)?,
        _ => serde_json::to_string_pretty(data).map_err(render_err)?,
    };
    Ok(rendered)
}

fn render_err(err: impl std::fmt::Display) -> CliError {
    CliError::Render(err.to_string())
}

// ── Event lines ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct EventRecord<'a> {
    received_at: DateTime<Local>,
    #[serde(flatten)]
    event: &'a ClientEvent,
}

/// Render one streamed event.
///
/// Structured formats produce one compact JSON (or YAML document) per
/// event so the output can be consumed line by line.
pub fn render_event(
    format: OutputFormat,
    event: &ClientEvent,
    received_at: DateTime<Local>,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(&EventRecord { received_at, event }).map_err(render_err)
        }
        OutputFormat::Yaml => {
            let doc = serde_yaml::to_string(&EventRecord { received_at, event })
                .map_err(render_err)?;
            Ok(format!("---\n{}", doc.trim_end()))
        }
        OutputFormat::Plain => Ok(event_text(event)),
        OutputFormat::Table => {
            let stamp = received_at.format("%H:%M:%S").to_string();
            let text = event_text(event);
            if !color {
                return Ok(format!("{stamp}  {text}"));
            }
            let failed = match event {
                ClientEvent::Response(response) => response.is_error(),
                ClientEvent::ConnectionError { .. } => true,
            };
            let text = if failed {
                text.red().bold().to_string()
            } else {
                text.green().to_string()
            };
            Ok(format!("{}  {text}", stamp.dimmed()))
        }
    }
}

fn event_text(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Response(response) => response.to_string(),
        ClientEvent::ConnectionError { reason } => format!("connection error: {reason}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use tivoctl_core::ResponseEvent;

    use super::*;

    fn at() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 20, 15, 3)
            .single()
            .unwrap()
    }

    #[derive(Serialize)]
    struct Item {
        name: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Name")]
        name: String,
    }

    #[test]
    fn plain_list_is_one_id_per_line() {
        let items = [Item { name: "den" }, Item { name: "office" }];
        let out = render_list(
            OutputFormat::Plain,
            &items,
            |i| ItemRow {
                name: i.name.into(),
            },
            |i| i.name.into(),
        )
        .unwrap();
        assert_eq!(out, "den\noffice");
    }

    #[test]
    fn table_list_has_headers() {
        let items = [Item { name: "den" }];
        let out = render_list(
            OutputFormat::Table,
            &items,
            |i| ItemRow {
                name: i.name.into(),
            },
            |i| i.name.into(),
        )
        .unwrap();
        assert!(out.contains("Name"));
        assert!(out.contains("den"));
    }

    #[test]
    fn uncolored_event_line_has_timestamp() {
        let event = ClientEvent::Response(ResponseEvent::ChannelChanged {
            channel: "0042".into(),
            source: "LOCAL".into(),
        });
        let line = render_event(OutputFormat::Table, &event, at(), false).unwrap();
        assert_eq!(line, "20:15:03  channel 0042 (LOCAL)");
    }

    #[test]
    fn json_event_line_is_compact_and_tagged() {
        let event = ClientEvent::ConnectionError {
            reason: "reset".into(),
        };
        let line = render_event(OutputFormat::Json, &event, at(), false).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "connection_error");
        assert_eq!(value["reason"], "reset");
        assert!(value["received_at"].is_string());
    }
}
