//! Subcommands of the `folio` binary.

use clap::{ArgMatches, Command};

use crate::config::FolioConfig;
use crate::errors::{FolioError, Result};

pub mod seed;
#[cfg(feature = "http-server")]
pub mod serve;

/// Every subcommand, in help order.
pub fn all_commands() -> Vec<Command> {
    let mut commands = Vec::new();
    #[cfg(feature = "http-server")]
    commands.push(serve::serve_command());
    commands.push(seed::seed_command());
    commands
}

/// Dispatch a parsed subcommand to its handler.
pub async fn dispatch_command(name: &str, matches: &ArgMatches, config: &FolioConfig) -> Result<()> {
    match name {
        #[cfg(feature = "http-server")]
        "serve" => serve::handle_serve(matches, config).await?,
        "seed" => seed::handle_seed(matches, config).await?,
        _ => return Err(FolioError::Command(format!("Unknown command: {}", name))),
    }
    Ok(())
}
