//! Command dispatch: bridges CLI args -> core session/registry -> output.

pub mod config_cmd;
pub mod discover;
pub mod remote;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;

/// Dispatch a command that needs the loaded configuration.
pub async fn dispatch(cmd: Command, cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, cfg, global),
        Command::Buttons => remote::list_buttons(global),
        Command::Discover(args) => discover::handle(args, &cfg, global).await,
        Command::Press(args) => {
            remote::press(args, config::resolve_target(global, &cfg)?, global).await
        }
        Command::Ir(args) => remote::ir(args, config::resolve_target(global, &cfg)?, global).await,
        Command::Keyboard(args) => {
            remote::keyboard(args, config::resolve_target(global, &cfg)?, global).await
        }
        Command::Teleport(args) => {
            remote::teleport(args, config::resolve_target(global, &cfg)?, global).await
        }
        Command::Channel(args) => {
            remote::channel(args, config::resolve_target(global, &cfg)?, global).await
        }
        Command::Watch => watch::handle(config::resolve_target(global, &cfg)?, global).await,
        // Handled before the config is loaded
        Command::Completions(_) => unreachable!(),
    }
}
