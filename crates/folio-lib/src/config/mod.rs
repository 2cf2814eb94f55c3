//! Application configuration.
//!
//! `FolioConfig` is read once from the environment at startup and then
//! adjusted by command-line flags before anything is built from it.

use std::path::PathBuf;

use chrono::FixedOffset;

use crate::errors::{FolioError, Result};
use crate::normalize::Normalizer;

pub const DATABASE_ENV: &str = "FOLIO_DATABASE";
pub const HOST_ENV: &str = "FOLIO_HOST";
pub const PORT_ENV: &str = "FOLIO_PORT";
pub const API_KEY_ENV: &str = "FOLIO_API_KEY";
pub const DATE_OFFSET_ENV: &str = "FOLIO_DATE_OFFSET";
pub const LOG_FORMAT_ENV: &str = "FOLIO_LOG_FORMAT";

pub const DEFAULT_DATE_OFFSET: &str = "+07:00";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(FolioError::Config(format!(
                "unknown log format {other:?} (expected \"text\" or \"json\")"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FolioConfig {
    pub database: PathBuf,
    pub host: String,
    pub port: u16,
    /// Key that authorizes writes. `None` means writes are refused.
    pub api_key: Option<String>,
    /// UTC offset in which timestamps are rendered as calendar dates.
    pub date_offset: FixedOffset,
    pub log_format: LogFormat,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("folio.db"),
            host: "0.0.0.0".into(),
            port: 8080,
            api_key: None,
            date_offset: Normalizer::default().offset(),
            log_format: LogFormat::Text,
        }
    }
}

impl FolioConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DATABASE_ENV) {
            config.database = PathBuf::from(path);
        }
        if let Some(host) = lookup(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.port = port.trim().parse().map_err(|_| {
                FolioError::Config(format!("{PORT_ENV} must be a port number, got {port:?}"))
            })?;
        }
        config.api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());
        if let Some(offset) = lookup(DATE_OFFSET_ENV) {
            config.date_offset = parse_utc_offset(&offset)?;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.date_offset)
    }
}

/// Parse a UTC offset such as `+07:00`, `-0530`, `+9` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let text = raw.trim();
    let invalid = || FolioError::Config(format!("invalid UTC offset {raw:?}"));

    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
