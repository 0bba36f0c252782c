use crate::record::{Level, LogRecord};
use std::sync::{Arc, RwLock};

/// Reserved names of the built-in formatters.
pub mod names {
    pub const SIMPLE: &str = "simple";
    pub const JSON: &str = "json";
    pub const SYSTEMD: &str = "systemd";
    pub const THEMED: &str = "themed";
}

/// Usage errors surfaced by a formatter.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The `None` sentinel (or an otherwise unrenderable level) reached a
    /// formatter; callers must filter such records out, not display them.
    #[error("level {0} is not loggable")]
    UnloggableLevel(Level),
}

/// Turns one [`LogRecord`] into one formatted line.
///
/// `Ok(None)` means the record is suppressed: by contract a record with no
/// attached error and an empty message produces no output from any
/// variant. A returned line is terminated by `\n` and may contain ANSI
/// escape sequences for the downstream parser.
pub trait Formatter: Send + Sync {
    /// Registry key, matched case-insensitively.
    fn name(&self) -> &'static str;

    fn format(&self, record: &LogRecord) -> Result<Option<String>, FormatError>;
}

/// Shared suppression rule.
pub(crate) fn is_suppressed(record: &LogRecord) -> bool {
    record.error.is_none() && record.message.is_empty()
}

/// Replace embedded newlines with `replacement`; the line-join policy of
/// each variant is expressed through the replacement it passes.
pub(crate) fn replace_newlines(text: &str, replacement: &str) -> String {
    // Normalize Windows line endings first so `\r` never leaks through.
    text.replace("\r\n", "\n").replace('\n', replacement)
}

/// Named formatters plus the current selection.
///
/// Mirrors [`ThemeProvider`](crate::theme::ThemeProvider): lookup is
/// case-insensitive, and an unknown or unset configured name falls back to
/// the `simple` formatter.
pub struct FormatterRegistry {
    formatters: Vec<Arc<dyn Formatter>>,
    current: RwLock<Arc<dyn Formatter>>,
}

impl FormatterRegistry {
    /// Build a registry over `formatters`; the first entry is the
    /// fallback and initial selection. The list must not be empty.
    pub fn new(formatters: Vec<Arc<dyn Formatter>>) -> Self {
        assert!(!formatters.is_empty(), "formatter registry needs at least one formatter");
        let initial = formatters[0].clone();
        FormatterRegistry { formatters, current: RwLock::new(initial) }
    }

    /// The currently selected formatter.
    pub fn current(&self) -> Arc<dyn Formatter> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-resolve the selection by name; unknown or unset names select
    /// the fallback.
    pub fn reload(&self, formatter_name: Option<&str>) {
        let resolved = formatter_name
            .and_then(|name| {
                self.formatters
                    .iter()
                    .find(|formatter| formatter.name().eq_ignore_ascii_case(name))
            })
            .unwrap_or(&self.formatters[0])
            .clone();

        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = resolved;
    }
}
