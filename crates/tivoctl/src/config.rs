//! CLI configuration: thin wrapper around `tivoctl_config` shared types.
//!
//! Adds the resolution that respects `GlobalOpts` flag overrides
//! (--address, --port, --timeout, --config, --output, --color).

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use tivoctl_config::ConfigError;
use tivoctl_core::{ClientConfig, Device};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use tivoctl_config::{Config, Profile, discovery_config};

/// The appliance a command talks to, and how.
#[derive(Debug)]
pub struct Target {
    pub device: Device,
    pub client: ClientConfig,
}

/// Config file in use: `--config` / `TIVOCTL_CONFIG`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(tivoctl_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match &global.config {
        Some(path) => tivoctl_config::load_config_from(path)?,
        None => tivoctl_config::load_config()?,
    };
    Ok(cfg)
}

pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    match &global.config {
        Some(path) => tivoctl_config::save_config_to(cfg, path)?,
        None => tivoctl_config::save_config(cfg)?,
    }
    Ok(())
}

/// Fill `--output` and `--color` from `[defaults]` where the command line
/// left them unset.
pub fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        global.output = Some(parse_choice("defaults.output", &cfg.defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_choice("defaults.color", &cfg.defaults.color)?);
    }
    Ok(())
}

fn parse_choice<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Look up a profile the user named explicitly.
pub fn named_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    cfg.profile(name).map_err(|err| match err {
        ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
            name,
            available: available_profiles(cfg),
        },
        other => other.into(),
    })
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> Option<String> {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
}

/// Pick the appliance and connection settings for a command.
///
/// `--address` wins over any profile. An explicitly named profile that
/// does not exist is an error; a missing default profile just means no
/// target.
pub fn resolve_target(global: &GlobalOpts, cfg: &Config) -> Result<Target, CliError> {
    let profile = match &global.profile {
        Some(name) => Some(named_profile(cfg, name)?),
        None => active_profile_name(global, cfg).and_then(|name| cfg.profiles.get(&name)),
    };

    let (device, mut client) = match (&global.address, profile) {
        (Some(address), profile) => {
            let device = match profile {
                Some(p) if p.address == *address => p.device(),
                _ => Device::manual(address.clone()),
            };
            let client = match profile {
                Some(p) => tivoctl_config::profile_to_client_config(p, &cfg.defaults)?,
                None => tivoctl_config::default_client_config(&cfg.defaults)?,
            };
            (device, client)
        }
        (None, Some(p)) => (
            p.device(),
            tivoctl_config::profile_to_client_config(p, &cfg.defaults)?,
        ),
        (None, None) => return Err(CliError::NoTarget),
    };

    if device.address.trim().is_empty() {
        return Err(CliError::Validation {
            field: "address".into(),
            reason: "must not be empty".into(),
        });
    }
    if let Some(port) = global.port {
        if port == 0 {
            return Err(CliError::Validation {
                field: "port".into(),
                reason: "must be non-zero".into(),
            });
        }
        client.transport.port = port;
    }
    if let Some(timeout) = global.timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        client.transport.connect_timeout = Duration::from_secs(timeout);
    }

    Ok(Target { device, client })
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
