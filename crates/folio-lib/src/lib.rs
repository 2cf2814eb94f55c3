// folio-lib: portfolio content API shared by the folio binary

// Always-available modules
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod forms;
pub mod logger;
pub mod normalize;
pub mod signal;
pub mod store;

// Feature-gated modules
#[cfg(feature = "http-server")]
pub mod server;
