//! Clap derive structures for the `tivoctl` CLI.
//!
//! Defines the command tree, global flags, and shared types. Only clap and
//! clap_complete may be used here: build.rs includes this file to render
//! man pages and completions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tivoctl -- remote control for TiVo DVRs on your network
#[derive(Debug, Parser)]
#[command(
    name = "tivoctl",
    version,
    about = "Control TiVo DVRs from the command line",
    long_about = "Discovers TiVo DVRs on the local network over mDNS and drives them\n\
        through the TCP remote protocol (port 31339): remote-control buttons,\n\
        keyboard keys, channel changes and screen teleports.\n\n\
        Network remote control must be enabled on the DVR.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Appliance profile to use
    #[arg(long, short = 'p', env = "TIVOCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Appliance host name or IP address (overrides profile)
    #[arg(long, short = 'a', env = "TIVOCTL_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Protocol port (overrides profile; the DVR listens on 31339)
    #[arg(long, env = "TIVOCTL_PORT", global = true)]
    pub port: Option<u16>,

    /// Connect timeout in seconds (overrides profile)
    #[arg(long, env = "TIVOCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Config file to use instead of the platform default
    #[arg(long, env = "TIVOCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: `defaults.output` from config, else table]
    #[arg(long, short = 'o', env = "TIVOCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: `defaults.color` from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    #[default]
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find TiVos advertising remote control on the local network
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Press one or more remote-control buttons
    #[command(alias = "p")]
    Press(PressArgs),

    /// List the remote-control buttons `press` understands
    Buttons,

    /// Send a raw IR code (IRCODE)
    Ir(CodeArgs),

    /// Send a raw keyboard code (KEYBOARD)
    #[command(alias = "kb")]
    Keyboard(CodeArgs),

    /// Jump straight to a screen (TELEPORT), e.g. LIVETV, GUIDE, NOWPLAYING, TIVO
    Teleport(TeleportArgs),

    /// Change the channel (SETCH, or FORCECH with --force)
    #[command(alias = "ch")]
    Channel(ChannelArgs),

    /// Stream everything the DVR reports until interrupted
    Watch,

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── discover ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Seconds to listen for advertisements
    #[arg(long, short = 'd', default_value = "3")]
    pub duration: u64,

    /// Keep listening and report devices as they appear
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── press / ir / keyboard / teleport ─────────────────────────────────

#[derive(Debug, Args)]
pub struct PressArgs {
    /// Buttons to press in order (see `tivoctl buttons`)
    #[arg(required = true, num_args = 1..)]
    pub buttons: Vec<String>,

    /// Milliseconds to wait between presses
    #[arg(long, default_value = "250")]
    pub delay: u64,
}

#[derive(Debug, Args)]
pub struct CodeArgs {
    /// Code to send, e.g. GUIDE or NUM5
    pub code: String,
}

#[derive(Debug, Args)]
pub struct TeleportArgs {
    /// Screen name, e.g. LIVETV
    pub screen: String,
}

// ── channel ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChannelArgs {
    /// Channel number
    pub channel: u32,

    /// Subchannel (omitted when not given or 0)
    #[arg(long, short = 's')]
    pub subchannel: Option<u32>,

    /// Stop a recording in progress if needed (FORCECH)
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Wait for the DVR to confirm or refuse the change
    #[arg(long, short = 'w')]
    pub wait: bool,
}

// ── config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,

        /// Appliance host name or IP address
        address: String,

        /// Display name for the appliance
        #[arg(long)]
        label: Option<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(alias = "rm")]
    Remove {
        /// Profile name
        name: String,
    },

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
