use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands;
use crate::config::LogFormat;
use crate::errors::Result;

/// Creates the root clap Command with global `--verbose` and `--log-format`
/// flags and every subcommand attached.
pub fn create_root_command() -> Command {
    Command::new("folio")
        .about("Bilingual portfolio content API")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["text", "json"])
                .help("Log line format (overrides FOLIO_LOG_FORMAT)"),
        )
        .subcommands(commands::all_commands())
}

/// Returns whether verbose mode is active based on parsed matches.
pub fn is_verbose(matches: &ArgMatches) -> bool {
    matches.get_flag("verbose")
}

/// The log format requested on the command line, if any.
pub fn log_format(matches: &ArgMatches) -> Result<Option<LogFormat>> {
    matches
        .get_one::<String>("log-format")
        .map(|raw| raw.parse())
        .transpose()
}
