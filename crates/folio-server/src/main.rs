use folio_lib::cli::{create_root_command, is_verbose, log_format};
use folio_lib::config::{FolioConfig, LogFormat};
use folio_lib::errors::{handle_fatal, FolioError};

#[tokio::main]
async fn main() {
    // Step 1: Parse arguments
    let matches = create_root_command().get_matches();

    let verbose = is_verbose(&matches);

    // Step 2: Load configuration from the environment
    let config = match FolioConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            folio_lib::logger::init(verbose, LogFormat::default());
            handle_fatal(e)
        }
    };

    // Step 3: Initialize logger, command-line flags win over the environment
    let format = match log_format(&matches) {
        Ok(flag) => flag.unwrap_or(config.log_format),
        Err(e) => handle_fatal(e),
    };
    folio_lib::logger::init(verbose, format);
    folio_lib::logger::set_verbose(verbose);

    // Step 4: Dispatch to subcommand handler
    match matches.subcommand() {
        Some((name, sub_matches)) => {
            tracing::debug!(command = name, "Executing command");
            if let Err(e) =
                folio_lib::commands::dispatch_command(name, sub_matches, &config).await
            {
                handle_fatal(e);
            }
        }
        None => {
            if let Err(e) = create_root_command().print_help() {
                handle_fatal(FolioError::Io(e));
            }
        }
    }
}
