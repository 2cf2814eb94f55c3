//! Response normalization.
//!
//! Every successful API response passes through [`Normalizer::normalize`],
//! which turns a storage [`Value`] into a `serde_json::Value` that encodes
//! without loss or surprise:
//!
//! 1. big integers become their exact decimal string,
//! 2. timestamps become a `D/M/YYYY` calendar date in a pinned UTC offset,
//! 3. arrays and records are rebuilt element by element,
//! 4. scalars pass through (non-finite floats become `null`).
//!
//! The rules are checked in that order. The input is never mutated.

pub mod value;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::{Map, Number};

pub use value::Value;

/// Offset used for calendar dates when nothing else is configured: UTC+07:00.
pub const DEFAULT_DATE_OFFSET_SECS: i32 = 7 * 3600;

/// Stateless transform from storage values to JSON-safe values.
///
/// The only setting is the UTC offset in which timestamps are reduced to a
/// calendar date, so output never depends on the host's locale or timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Default for Normalizer {
    fn default() -> Self {
        let offset = FixedOffset::east_opt(DEFAULT_DATE_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        Self::new(offset)
    }
}

impl Normalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Convert `value` into a JSON-safe equivalent.
    pub fn normalize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::BigInt(n) => serde_json::Value::String(n.to_string()),
            Value::Timestamp(ts) => serde_json::Value::String(self.format_date(ts)),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| self.normalize(v)).collect())
            }
            Value::Record(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (key, v) in fields {
                    map.insert(key.clone(), self.normalize(v));
                }
                serde_json::Value::Object(map)
            }
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number(Number::from(*n)),
            Value::UInt(n) => serde_json::Value::Number(Number::from(*n)),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Calendar date of `ts` in the configured offset, as `D/M/YYYY`.
    pub fn format_date(&self, ts: &DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset).format("%-d/%-m/%Y").to_string()
    }
}
