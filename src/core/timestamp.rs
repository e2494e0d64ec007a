//! Timestamp rendering for the default formatter

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp format used by [`DefaultFormatter`](super::formatter::DefaultFormatter)
///
/// # Examples
///
/// ```
/// use tidelog::core::TimestampFormat;
/// use chrono::Utc;
///
/// let timestamp = TimestampFormat::Iso8601.format(&Utc::now());
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2026-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// `2026-01-08T10:30:45.123456Z`
    Iso8601Micros,

    /// `2026-01-08T10:30:45.123456+00:00`
    Rfc3339,

    /// Milliseconds since the Unix epoch
    UnixMillis,

    /// Any strftime-compatible format string
    Custom(String),
}

impl TimestampFormat {
    /// Render into a new string; an invalid custom pattern renders short
    /// or empty instead of failing.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        let mut out = String::new();
        let _ = self.write_to(datetime, &mut out);
        out
    }

    /// Render into `out`, returning `fmt::Error` for an invalid custom pattern
    pub fn write_to<W: fmt::Write>(&self, datetime: &DateTime<Utc>, out: &mut W) -> fmt::Result {
        match self {
            TimestampFormat::Iso8601 => write!(out, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            TimestampFormat::Iso8601Micros => {
                write!(out, "{}", datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
            }
            TimestampFormat::Rfc3339 => out.write_str(&datetime.to_rfc3339()),
            TimestampFormat::UnixMillis => write!(out, "{}", datetime.timestamp_millis()),
            TimestampFormat::Custom(pattern) => write!(out, "{}", datetime.format(pattern)),
        }
    }

    /// False for a custom pattern containing an unknown strftime item
    pub fn is_valid(&self) -> bool {
        match self {
            TimestampFormat::Custom(pattern) => {
                !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
            }
            _ => true,
        }
    }
}
