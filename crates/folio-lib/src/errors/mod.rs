use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown column {column} for {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Command error: {0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, FolioError>;

/// Logs a fatal error and exits the process with code 1.
///
/// Intended for unrecoverable errors during startup or command execution.
pub fn handle_fatal(err: FolioError) -> ! {
    tracing::error!("Fatal error: {}", err);
    std::process::exit(1)
}
