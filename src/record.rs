use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a [`LogRecord`], ordered from least to most severe.
///
/// `None` is a reserved sentinel used only for filtering ("log nothing");
/// passing it to a formatter is a usage error and is rejected with
/// [`FormatError::UnloggableLevel`](crate::formatter::FormatError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Critical,
    None,
}

impl Level {
    /// Canonical name, as emitted by the json formatter.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Critical => "Critical",
            Level::None => "None",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed from configuration.
#[derive(thiserror::Error, Debug)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Case-insensitive; accepts the short aliases used in config files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "information" | "info" => Ok(Level::Information),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" | "crit" => Ok(Level::Critical),
            "none" => Ok(Level::None),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// One entry of a record's scope chain, outermost first.
///
/// Scopes come from the active `tracing` span chain: a span without fields
/// is a flat string, a span with recorded fields keeps them as typed values
/// so the json formatter can emit them in their natural representation.
#[derive(Debug, Clone, Serialize)]
pub enum ScopeEntry {
    Text(String),
    KeyValues {
        /// Flat rendering used by the line-oriented formatters,
        /// e.g. `request{id=42 method="GET"}`.
        message: String,
        values: Vec<(String, serde_json::Value)>,
    },
}

impl ScopeEntry {
    /// The flat string form, used wherever a scope is rendered inline.
    pub fn message(&self) -> &str {
        match self {
            ScopeEntry::Text(text) => text,
            ScopeEntry::KeyValues { message, .. } => message,
        }
    }
}

/// Structured error attached to a record, carried as rendered text.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub message: String,
    pub backtrace: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorDetails { message: message.into(), backtrace: None }
    }

    /// Single-string rendering: message, then the backtrace on following
    /// lines when one was captured.
    pub fn display(&self) -> String {
        match &self.backtrace {
            Some(backtrace) => format!("{}\n{}", self.message, backtrace),
            None => self.message.clone(),
        }
    }
}

/// A single structured log record, immutable once constructed.
///
/// Produced either by the [`TextViewLayer`](crate::layer::TextViewLayer)
/// from a `tracing` event or directly by an embedder, and consumed
/// read-only by the formatters.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: String,
    pub event_id: i64,
    /// Rendered message; may be empty, in which case the record is
    /// suppressed unless an error is attached.
    pub message: String,
    pub error: Option<ErrorDetails>,
    /// Event fields other than `message` and `event_id`, in field order.
    pub fields: Vec<(String, serde_json::Value)>,
    /// Active scope chain, outermost first.
    pub scopes: Vec<ScopeEntry>,
}

impl LogRecord {
    pub fn new(level: Level, category: impl Into<String>, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            category: category.into(),
            event_id: 0,
            message: message.into(),
            error: None,
            fields: Vec::new(),
            scopes: Vec::new(),
        }
    }

    pub fn with_event_id(mut self, event_id: i64) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_error(mut self, error: ErrorDetails) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_scope(mut self, scope: ScopeEntry) -> Self {
        self.scopes.push(scope);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_order_matches_severity() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Information);
        assert!(Level::Information < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
        assert!(Level::Critical < Level::None);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("info".parse::<Level>().unwrap(), Level::Information);
        assert_eq!("Crit".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn error_details_display_appends_backtrace() {
        let plain = ErrorDetails::new("boom");
        assert_eq!(plain.display(), "boom");

        let with_trace = ErrorDetails {
            message: "boom".into(),
            backtrace: Some("at main.rs:1".into()),
        };
        assert_eq!(with_trace.display(), "boom\nat main.rs:1");
    }
}
