//! Configuration for tivoctl.
//!
//! TOML profiles naming appliances, global defaults, environment overrides,
//! and translation to `tivoctl_core` runtime config. The CLI adds
//! flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tivoctl_core::{ClientConfig, DEFAULT_PORT, Device, DiscoveryConfig, TransportConfig};

/// Prefix for environment overrides, e.g. `TIVOCTL_DEFAULTS__TIMEOUT=3`.
pub const ENV_PREFIX: &str = "TIVOCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Discovery re-scan interval in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Drop devices whose advertisement is withdrawn.
    #[serde(default)]
    pub evict_on_removal: bool,

    /// Record IPv6 addresses of discovered appliances.
    #[serde(default)]
    pub include_ipv6: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            port: default_port(),
            refresh_interval: default_refresh_interval(),
            evict_on_removal: false,
            include_ipv6: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_refresh_interval() -> u64 {
    5
}

/// A named appliance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Host name or IP address of the appliance.
    pub address: String,

    /// Display name; defaults to "unknown".
    pub name: Option<String>,

    /// Override the protocol port.
    pub port: Option<u16>,

    /// Override the connect timeout (seconds).
    pub timeout: Option<u64>,
}

impl Profile {
    /// The device this profile points at.
    pub fn device(&self) -> Device {
        match &self.name {
            Some(name) => Device::new(name.clone(), self.address.clone()),
            None => Device::manual(self.address.clone()),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tivoctl", "tivoctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tivoctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load Config from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to runtime config ───────────────────────────────────

/// Build a `ClientConfig` from a profile, falling back to `defaults`.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    if profile.address.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "address".into(),
            reason: "must not be empty".into(),
        });
    }

    transport_config(
        profile.port.unwrap_or(defaults.port),
        profile.timeout.unwrap_or(defaults.timeout),
    )
    .map(|transport| ClientConfig { transport })
}

/// Build a `ClientConfig` from defaults alone (for ad-hoc addresses).
pub fn default_client_config(defaults: &Defaults) -> Result<ClientConfig, ConfigError> {
    transport_config(defaults.port, defaults.timeout).map(|transport| ClientConfig { transport })
}

fn transport_config(port: u16, timeout_secs: u64) -> Result<TransportConfig, ConfigError> {
    if port == 0 {
        return Err(ConfigError::Validation {
            field: "port".into(),
            reason: "must be non-zero".into(),
        });
    }
    if timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    Ok(TransportConfig {
        port,
        connect_timeout: Duration::from_secs(timeout_secs),
        ..TransportConfig::default()
    })
}

/// Build a `DiscoveryConfig` from the global defaults.
pub fn discovery_config(defaults: &Defaults) -> DiscoveryConfig {
    DiscoveryConfig {
        include_ipv6: defaults.include_ipv6,
        evict_on_removal: defaults.evict_on_removal,
        refresh_interval: Duration::from_secs(defaults.refresh_interval.max(1)),
        ..DiscoveryConfig::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
