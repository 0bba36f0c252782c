//! The `themed` formatter: ANSI codes from the active theme around each
//! semantic element, or around the whole line.
//!
//! Line-join policy: embedded newlines become a newline plus a 7-space
//! continuation padding aligned under the level column.

use crate::formatter::{is_suppressed, names, replace_newlines, FormatError, Formatter};
use crate::options::{OptionsHandle, ThemedFormatterOptions};
use crate::record::{Level, LogRecord};
use crate::theme::ThemeProvider;
use std::sync::Arc;

/// Width of the level column: `TRACE` plus `": "`.
const MESSAGE_PADDING: &str = "       ";
const NEWLINE_WITH_PADDING: &str = "\n       ";
const RESET_COLOR: &str = "\u{1b}[39m\u{1b}[22m\u{1b}[49m";

pub struct ThemedFormatter {
    options: Arc<OptionsHandle<ThemedFormatterOptions>>,
    themes: Arc<ThemeProvider>,
}

impl ThemedFormatter {
    pub fn new(
        options: Arc<OptionsHandle<ThemedFormatterOptions>>,
        themes: Arc<ThemeProvider>,
    ) -> Self {
        ThemedFormatter { options, themes }
    }
}

fn level_string(level: Level) -> Result<&'static str, FormatError> {
    match level {
        Level::Trace => Ok("TRACE"),
        Level::Debug => Ok("DEBUG"),
        Level::Information => Ok("INFO"),
        Level::Warning => Ok("WARN"),
        Level::Error => Ok("FAIL"),
        Level::Critical => Ok("CRIT"),
        Level::None => Err(FormatError::UnloggableLevel(Level::None)),
    }
}

/// Color one element and reset after it. In color-whole-line mode the
/// per-element codes are skipped; the line color wraps everything.
fn write_colored(out: &mut String, color: &str, text: &str, color_whole_line: bool) {
    let colored = !color_whole_line && !color.is_empty();
    if colored {
        out.push_str(color);
    }
    out.push_str(text);
    if colored {
        out.push_str(RESET_COLOR);
    }
}

impl Formatter for ThemedFormatter {
    fn name(&self) -> &'static str {
        names::THEMED
    }

    fn format(&self, record: &LogRecord) -> Result<Option<String>, FormatError> {
        if is_suppressed(record) {
            return Ok(None);
        }
        let level = level_string(record.level)?;
        let options = self.options.get();
        let theme = self.themes.current();
        let whole_line = options.color_whole_line;

        let mut out = String::new();
        if whole_line {
            out.push_str(theme.line_color(record.level));
        }

        if let Some(timestamp) = options.common.format_timestamp(&record.timestamp) {
            write_colored(&mut out, theme.time_color(&record.timestamp), &timestamp, whole_line);
            out.push(' ');
        }

        write_colored(&mut out, theme.level_color(record.level), level, whole_line);
        out.push_str(": ");

        if !record.category.is_empty() {
            write_colored(&mut out, theme.category_color(&record.category), &record.category, whole_line);
        }

        let event_id_color = theme.event_id_color(record.event_id);
        let event_id_colored = !whole_line && !event_id_color.is_empty();
        if event_id_colored {
            out.push_str(event_id_color);
        }
        out.push('[');
        out.push_str(&record.event_id.to_string());
        out.push(']');
        if event_id_colored {
            out.push_str(RESET_COLOR);
        }
        out.push(' ');

        if options.common.include_scopes {
            for scope in &record.scopes {
                out.push_str("=> ");
                write_colored(&mut out, theme.scope_color(scope), scope.message(), whole_line);
                out.push(' ');
            }
        }

        if !record.message.is_empty() {
            let message = replace_newlines(&record.message, NEWLINE_WITH_PADDING);
            write_colored(&mut out, theme.message_color(&message), &message, whole_line);
        }

        if let Some(error) = &record.error {
            out.push_str(NEWLINE_WITH_PADDING);
            let rendered = replace_newlines(&error.display(), NEWLINE_WITH_PADDING);
            write_colored(&mut out, theme.error_color(error), &rendered, whole_line);
        }

        if whole_line {
            out.push_str(RESET_COLOR);
        }
        out.push('\n');
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansi;
    use crate::record::{ErrorDetails, ScopeEntry};
    use crate::theme::{ColorSupport, MelTheme, NLogTheme, SerilogTheme, Theme};

    fn themes(color: ColorSupport) -> Arc<ThemeProvider> {
        Arc::new(ThemeProvider::with_themes(
            vec![
                Arc::new(MelTheme) as Arc<dyn Theme>,
                Arc::new(NLogTheme),
                Arc::new(SerilogTheme),
            ],
            color,
        ))
    }

    fn formatter(options: ThemedFormatterOptions, themes: Arc<ThemeProvider>) -> ThemedFormatter {
        themes.reload(options.theme.as_deref());
        ThemedFormatter::new(Arc::new(OptionsHandle::new(options)), themes)
    }

    fn request_record() -> LogRecord {
        LogRecord::new(Level::Information, "App.Program", "Request received").with_event_id(10)
    }

    #[test]
    fn mel_theme_colors_the_level_token() {
        let formatter = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::Color));
        let line = formatter.format(&request_record()).unwrap().unwrap();
        assert_eq!(
            line,
            "\u{1b}[32m\u{1b}[40mINFO\u{1b}[39m\u{1b}[22m\u{1b}[49m: App.Program[10] Request received\n"
        );
    }

    #[test]
    fn whole_line_mode_wraps_once() {
        let options = ThemedFormatterOptions { color_whole_line: true, ..Default::default() };
        let formatter = formatter(options, themes(ColorSupport::Color));
        let line = formatter.format(&request_record()).unwrap().unwrap();
        assert_eq!(
            line,
            "\u{1b}[32m\u{1b}[40mINFO: App.Program[10] Request received\u{1b}[39m\u{1b}[22m\u{1b}[49m\n"
        );
    }

    #[test]
    fn serilog_theme_colors_category_and_message() {
        let options = ThemedFormatterOptions { theme: Some("serilog".into()), ..Default::default() };
        let formatter = formatter(options, themes(ColorSupport::Color));
        let line = formatter.format(&request_record()).unwrap().unwrap();
        assert!(
            line.contains("\u{1b}[38;5;0007mApp.Program\u{1b}[39m\u{1b}[22m\u{1b}[49m"),
            "got {line:?}"
        );
        assert!(
            line.contains("\u{1b}[38;5;0015mRequest received\u{1b}[39m\u{1b}[22m\u{1b}[49m"),
            "got {line:?}"
        );
    }

    #[test]
    fn no_color_environment_emits_no_escape_bytes() {
        let formatter = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::NoColor));
        let line = formatter.format(&request_record()).unwrap().unwrap();
        assert!(!line.contains('\u{1b}'), "got {line:?}");
        assert_eq!(line, "INFO: App.Program[10] Request received\n");
    }

    #[test]
    fn error_is_padded_onto_a_continuation_line() {
        let formatter = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::NoColor));
        let record = request_record().with_error(ErrorDetails {
            message: "io error".into(),
            backtrace: Some("at io.rs:9".into()),
        });
        let line = formatter.format(&record).unwrap().unwrap();
        assert_eq!(
            line,
            "INFO: App.Program[10] Request received\n       io error\n       at io.rs:9\n"
        );
    }

    #[test]
    fn scopes_render_between_event_id_and_message() {
        let mut options = ThemedFormatterOptions::default();
        options.common.include_scopes = true;
        let formatter = formatter(options, themes(ColorSupport::NoColor));
        let record = request_record()
            .with_scope(ScopeEntry::Text("outer".into()))
            .with_scope(ScopeEntry::Text("inner".into()));
        let line = formatter.format(&record).unwrap().unwrap();
        assert_eq!(line, "INFO: App.Program[10] => outer => inner Request received\n");
    }

    #[test]
    fn styled_output_round_trips_through_the_parser() {
        // The colored and colorless renderings must carry identical text.
        let colored = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::Color))
            .format(&request_record())
            .unwrap()
            .unwrap();
        let plain = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::NoColor))
            .format(&request_record())
            .unwrap()
            .unwrap();

        let mut stripped = String::new();
        ansi::parse(&colored, |segment| stripped.push_str(segment.text));
        assert_eq!(stripped, plain);
    }

    #[test]
    fn none_level_is_rejected() {
        let formatter = formatter(ThemedFormatterOptions::default(), themes(ColorSupport::Color));
        let record = LogRecord::new(Level::None, "App", "x");
        assert_eq!(
            formatter.format(&record),
            Err(FormatError::UnloggableLevel(Level::None))
        );
    }
}
