//! HTTP server command.
//!
//! Provides the `serve` command (aliases: `http`, `server`) that opens the
//! database and runs the API until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::config::FolioConfig;
use crate::errors::Result;
use crate::server::config::ServerConfig;
use crate::server::{start_server, AppState};
use crate::signal::SignalHandler;
use crate::store::SqliteStore;

/// Build the `serve` clap command.
pub fn serve_command() -> Command {
    Command::new("serve")
        .about("Start the HTTP API server")
        .aliases(["http", "server"])
        .arg(Arg::new("host").long("host").help("Host to bind HTTP server to (overrides FOLIO_HOST)"))
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .help("Port to run HTTP server on (overrides FOLIO_PORT)"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .value_parser(value_parser!(PathBuf))
                .help("SQLite database file (overrides FOLIO_DATABASE)"),
        )
}

/// Apply command-line overrides on top of the environment configuration.
pub fn apply_overrides(matches: &ArgMatches, config: &FolioConfig) -> FolioConfig {
    let mut config = config.clone();
    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(path) = matches.get_one::<PathBuf>("database") {
        config.database = path.clone();
    }
    config
}

/// Handle the `serve` command.
pub async fn handle_serve(matches: &ArgMatches, config: &FolioConfig) -> Result<()> {
    let config = apply_overrides(matches, config);
    let server_config = ServerConfig::from(&config);
    server_config.validate()?;

    let store = SqliteStore::open(&config.database)?;
    if config.api_key.is_none() {
        tracing::warn!("no API key configured, updates and deletes will be refused");
    }
    let state = Arc::new(AppState::new(
        Arc::new(store),
        config.normalizer(),
        config.api_key.clone(),
    ));

    let signals = SignalHandler::new();
    let token = signals.token();
    let listener = signals.spawn();

    let handle = start_server(server_config, state).await?;
    println!("Serving on http://{}", handle.local_addr());

    token.cancelled().await;
    handle.stop().await?;
    if let Err(e) = listener.await {
        tracing::debug!("signal listener ended abnormally: {}", e);
    }
    Ok(())
}
