//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, mut cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let format = global.output.unwrap_or_default();
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Render(e.to_string()))?
                }
                _ => output::render_single(format, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            print_path(global);
            Ok(())
        }

        ConfigCommand::Add {
            name,
            address,
            label,
            default,
        } => {
            let address = address.trim().to_string();
            if address.is_empty() {
                return Err(CliError::Validation {
                    field: "address".into(),
                    reason: "must not be empty".into(),
                });
            }

            let first = cfg.profiles.is_empty();
            let replaced = cfg
                .profiles
                .insert(
                    name.clone(),
                    Profile {
                        address,
                        name: label,
                        port: global.port,
                        timeout: global.timeout,
                    },
                )
                .is_some();
            if default || first {
                cfg.default_profile = Some(name.clone());
            }
            config::save(global, &cfg)?;

            if !global.quiet {
                let verb = if replaced { "Updated" } else { "Added" };
                eprintln!("{verb} profile '{name}'");
            }
            Ok(())
        }

        ConfigCommand::Remove { name } => {
            config::named_profile(&cfg, &name)?;
            cfg.profiles.remove(&name);
            if cfg.default_profile.as_deref() == Some(name.as_str()) {
                cfg.default_profile = None;
            }
            config::save(global, &cfg)?;

            if !global.quiet {
                eprintln!("Removed profile '{name}'");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            config::named_profile(&cfg, &name)?;
            cfg.default_profile = Some(name.clone());
            config::save(global, &cfg)?;

            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

/// Print the config file path. Always printed: scripts rely on it even
/// with --quiet.
pub fn print_path(global: &GlobalOpts) {
    println!("{}", config::config_file(global).display());
}
