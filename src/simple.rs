//! The `simple` formatter: fixed-column plain text.
//!
//! Layout: `[timestamp]level: category[eventId]`, then the message (and
//! error, when attached) on continuation lines indented to align under the
//! level column. Line-join policy: embedded newlines become a newline plus
//! the 6-space continuation padding, or a single space in single-line mode.

use crate::formatter::{is_suppressed, names, replace_newlines, FormatError, Formatter};
use crate::options::{ColorBehavior, OptionsHandle, SimpleFormatterOptions};
use crate::record::{Level, LogRecord};
use std::sync::Arc;

/// Width of the level column: `info` plus `": "`.
const MESSAGE_PADDING: &str = "      ";
const NEWLINE_WITH_PADDING: &str = "\n      ";
const RESET_FOREGROUND: &str = "\u{1b}[39m\u{1b}[22m";
const RESET_BACKGROUND: &str = "\u{1b}[49m";

pub struct SimpleFormatter {
    options: Arc<OptionsHandle<SimpleFormatterOptions>>,
}

impl SimpleFormatter {
    pub fn new(options: Arc<OptionsHandle<SimpleFormatterOptions>>) -> Self {
        SimpleFormatter { options }
    }
}

fn level_abbreviation(level: Level) -> Result<&'static str, FormatError> {
    match level {
        Level::Trace => Ok("trace"),
        Level::Debug => Ok("debug"),
        Level::Information => Ok("info"),
        Level::Warning => Ok("warn"),
        Level::Error => Ok("fail"),
        Level::Critical => Ok("crit"),
        Level::None => Err(FormatError::UnloggableLevel(Level::None)),
    }
}

struct LevelColors {
    foreground: Option<&'static str>,
    background: Option<&'static str>,
}

/// Console-style colors for the level token. Only `Enabled` colors; the
/// default behavior for a UI-bound sink is colorless.
fn level_colors(level: Level, behavior: ColorBehavior) -> LevelColors {
    if behavior != ColorBehavior::Enabled {
        return LevelColors { foreground: None, background: None };
    }
    match level {
        Level::Trace | Level::Debug => LevelColors {
            foreground: Some("\u{1b}[37m"),
            background: None,
        },
        Level::Information => LevelColors {
            foreground: Some("\u{1b}[32m"),
            background: None,
        },
        Level::Warning => LevelColors {
            foreground: Some("\u{1b}[1m\u{1b}[33m"),
            background: None,
        },
        Level::Error => LevelColors {
            foreground: Some("\u{1b}[30m"),
            background: Some("\u{1b}[41m"),
        },
        Level::Critical => LevelColors {
            foreground: Some("\u{1b}[1m\u{1b}[37m"),
            background: Some("\u{1b}[41m"),
        },
        Level::None => LevelColors { foreground: None, background: None },
    }
}

fn write_message(out: &mut String, message: &str, single_line: bool) {
    if message.is_empty() {
        return;
    }
    if single_line {
        out.push(' ');
        out.push_str(&replace_newlines(message, " "));
    } else {
        out.push_str(MESSAGE_PADDING);
        out.push_str(&replace_newlines(message, NEWLINE_WITH_PADDING));
        out.push('\n');
    }
}

impl Formatter for SimpleFormatter {
    fn name(&self) -> &'static str {
        names::SIMPLE
    }

    fn format(&self, record: &LogRecord) -> Result<Option<String>, FormatError> {
        if is_suppressed(record) {
            return Ok(None);
        }
        let level = level_abbreviation(record.level)?;
        let options = self.options.get();
        let single_line = options.single_line;

        let mut out = String::new();
        if let Some(timestamp) = options.common.format_timestamp(&record.timestamp) {
            out.push_str(&timestamp);
        }

        let colors = level_colors(record.level, options.color_behavior);
        // Order: background, foreground, token, reset foreground, reset
        // background.
        if let Some(background) = colors.background {
            out.push_str(background);
        }
        if let Some(foreground) = colors.foreground {
            out.push_str(foreground);
        }
        out.push_str(level);
        if colors.foreground.is_some() {
            out.push_str(RESET_FOREGROUND);
        }
        if colors.background.is_some() {
            out.push_str(RESET_BACKGROUND);
        }

        out.push_str(": ");
        out.push_str(&record.category);
        out.push('[');
        out.push_str(&record.event_id.to_string());
        out.push(']');
        if !single_line {
            out.push('\n');
        }

        if options.common.include_scopes && !record.scopes.is_empty() {
            let mut padding_needed = !single_line;
            for scope in &record.scopes {
                if padding_needed {
                    padding_needed = false;
                    out.push_str(MESSAGE_PADDING);
                    out.push_str("=> ");
                } else {
                    out.push_str(" => ");
                }
                out.push_str(scope.message());
            }
            if !single_line {
                out.push('\n');
            }
        }

        write_message(&mut out, &record.message, single_line);
        if let Some(error) = &record.error {
            write_message(&mut out, &error.display(), single_line);
        }
        if single_line {
            out.push('\n');
        }

        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ErrorDetails, ScopeEntry};
    use chrono::TimeZone;

    fn formatter(options: SimpleFormatterOptions) -> SimpleFormatter {
        SimpleFormatter::new(Arc::new(OptionsHandle::new(options)))
    }

    fn request_record() -> LogRecord {
        LogRecord::new(Level::Information, "App.Program", "Request received").with_event_id(10)
    }

    #[test]
    fn default_layout_matches_the_fixed_columns() {
        let line = formatter(SimpleFormatterOptions::default())
            .format(&request_record())
            .unwrap()
            .unwrap();
        assert_eq!(line, "info: App.Program[10]\n      Request received\n");
    }

    #[test]
    fn empty_message_without_error_is_suppressed() {
        let record = LogRecord::new(Level::Warning, "App", "");
        let result = formatter(SimpleFormatterOptions::default()).format(&record).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn empty_message_with_error_still_formats() {
        let record = LogRecord::new(Level::Error, "App", "")
            .with_error(ErrorDetails::new("connection reset"));
        let line = formatter(SimpleFormatterOptions::default())
            .format(&record)
            .unwrap()
            .unwrap();
        assert_eq!(line, "fail: App[0]\n      connection reset\n");
    }

    #[test]
    fn none_level_is_a_usage_error() {
        let record = LogRecord::new(Level::None, "App", "should not render");
        let result = formatter(SimpleFormatterOptions::default()).format(&record);
        assert_eq!(result, Err(FormatError::UnloggableLevel(Level::None)));
    }

    #[test]
    fn multiline_message_is_padded_to_the_level_column() {
        let record = LogRecord::new(Level::Debug, "App", "first\nsecond");
        let line = formatter(SimpleFormatterOptions::default())
            .format(&record)
            .unwrap()
            .unwrap();
        assert_eq!(line, "debug: App[0]\n      first\n      second\n");
    }

    #[test]
    fn single_line_collapses_newlines_to_spaces() {
        let options = SimpleFormatterOptions { single_line: true, ..Default::default() };
        let record = LogRecord::new(Level::Information, "App", "first\nsecond").with_event_id(7);
        let line = formatter(options).format(&record).unwrap().unwrap();
        assert_eq!(line, "info: App[7] first second\n");
    }

    #[test]
    fn scopes_render_outermost_first() {
        let mut options = SimpleFormatterOptions::default();
        options.common.include_scopes = true;
        let record = request_record()
            .with_scope(ScopeEntry::Text("outer".into()))
            .with_scope(ScopeEntry::Text("inner".into()));
        let line = formatter(options).format(&record).unwrap().unwrap();
        assert_eq!(
            line,
            "info: App.Program[10]\n      => outer => inner\n      Request received\n"
        );
    }

    #[test]
    fn timestamp_uses_the_configured_format() {
        let mut options = SimpleFormatterOptions::default();
        options.common.timestamp_format = Some("%Y-%m-%d ".into());
        let mut record = request_record();
        record.timestamp = chrono::Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let line = formatter(options).format(&record).unwrap().unwrap();
        assert!(line.starts_with("2024-05-06 info: "), "got {line:?}");
    }

    #[test]
    fn color_enabled_wraps_only_the_level_token() {
        let options = SimpleFormatterOptions {
            color_behavior: ColorBehavior::Enabled,
            ..Default::default()
        };
        let record = LogRecord::new(Level::Error, "App", "boom");
        let line = formatter(options).format(&record).unwrap().unwrap();
        assert!(
            line.starts_with("\u{1b}[41m\u{1b}[30mfail\u{1b}[39m\u{1b}[22m\u{1b}[49m: App[0]"),
            "got {line:?}"
        );
    }

    #[test]
    fn default_color_behavior_emits_no_escape_bytes() {
        let record = LogRecord::new(Level::Critical, "App", "down");
        let line = formatter(SimpleFormatterOptions::default())
            .format(&record)
            .unwrap()
            .unwrap();
        assert!(!line.contains('\u{1b}'));
    }
}
