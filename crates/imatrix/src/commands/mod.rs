//! Command dispatch: bridges CLI args -> hub -> output formatting.

pub mod config_cmd;
pub mod entities;
pub mod login;
pub mod things;
pub mod watch;

use imatrix_core::HubConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an account-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    hub_config: HubConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => login::handle(&hub_config, global).await,
        Command::Things => things::handle(hub_config, global).await,
        Command::Entities(args) => entities::handle(hub_config, args, global).await,
        Command::Watch(args) => watch::handle(hub_config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
