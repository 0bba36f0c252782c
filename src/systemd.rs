//! The `systemd` formatter: syslog severity prefix, one physical line.
//!
//! Line-join policy: embedded newlines collapse to single spaces so the
//! journal treats each record as exactly one entry.

use crate::formatter::{is_suppressed, names, replace_newlines, FormatError, Formatter};
use crate::options::{FormatterOptions, OptionsHandle};
use crate::record::{Level, LogRecord};
use std::sync::Arc;

pub struct SystemdFormatter {
    options: Arc<OptionsHandle<FormatterOptions>>,
}

impl SystemdFormatter {
    pub fn new(options: Arc<OptionsHandle<FormatterOptions>>) -> Self {
        SystemdFormatter { options }
    }
}

// 'Syslog Message Severities' from https://tools.ietf.org/html/rfc5424.
fn syslog_severity(level: Level) -> Result<&'static str, FormatError> {
    match level {
        Level::Trace | Level::Debug => Ok("<7>"),
        Level::Information => Ok("<6>"),
        Level::Warning => Ok("<4>"),
        Level::Error => Ok("<3>"),
        Level::Critical => Ok("<2>"),
        Level::None => Err(FormatError::UnloggableLevel(Level::None)),
    }
}

impl Formatter for SystemdFormatter {
    fn name(&self) -> &'static str {
        names::SYSTEMD
    }

    fn format(&self, record: &LogRecord) -> Result<Option<String>, FormatError> {
        if is_suppressed(record) {
            return Ok(None);
        }
        let severity = syslog_severity(record.level)?;
        let options = self.options.get();

        // <6>App.Program[10] Request received
        let mut out = String::new();
        out.push_str(severity);
        if let Some(timestamp) = options.format_timestamp(&record.timestamp) {
            out.push_str(&timestamp);
        }
        out.push_str(&record.category);
        out.push('[');
        out.push_str(&record.event_id.to_string());
        out.push(']');

        if options.include_scopes {
            for scope in &record.scopes {
                out.push_str(" => ");
                out.push_str(scope.message());
            }
        }

        if !record.message.is_empty() {
            out.push(' ');
            out.push_str(&replace_newlines(&record.message, " "));
        }
        if let Some(error) = &record.error {
            out.push(' ');
            out.push_str(&replace_newlines(&error.display(), " "));
        }

        out.push('\n');
        Ok(Some(out))
    }
}
