//! Named color themes for the themed formatter.
//!
//! A theme is a stateless mapping from a semantic log element to an ANSI
//! code string; an empty string means "no color". Themes are registered by
//! case-insensitive name, and the provider falls back to the no-color theme
//! for unknown names or when the environment cannot render color.

use crate::record::{ErrorDetails, Level, ScopeEntry};
use chrono::{DateTime, Utc};
use std::env;
use std::sync::{Arc, RwLock};

/// A stateless mapping from semantic log elements to ANSI code strings.
///
/// Every method receives the element it colors so a custom theme can vary
/// by content; the built-in themes only look at the log level.
pub trait Theme: Send + Sync {
    /// Registry key, matched case-insensitively.
    fn name(&self) -> &'static str;

    /// Color for the whole line when color-whole-line mode is on.
    fn line_color(&self, level: Level) -> &'static str;

    fn level_color(&self, level: Level) -> &'static str;

    fn category_color(&self, _category: &str) -> &'static str {
        ""
    }

    fn event_id_color(&self, _event_id: i64) -> &'static str {
        ""
    }

    fn message_color(&self, _message: &str) -> &'static str {
        ""
    }

    fn scope_color(&self, _scope: &ScopeEntry) -> &'static str {
        ""
    }

    fn error_color(&self, _error: &ErrorDetails) -> &'static str {
        ""
    }

    fn time_color(&self, _timestamp: &DateTime<Utc>) -> &'static str {
        ""
    }
}

/// Colors of the `Microsoft.Extensions.Logging` console formatter.
pub struct MelTheme;

impl Theme for MelTheme {
    fn name(&self) -> &'static str {
        "MEL"
    }

    fn line_color(&self, level: Level) -> &'static str {
        self.level_color(level)
    }

    fn level_color(&self, level: Level) -> &'static str {
        match level {
            Level::Trace | Level::Debug => "\u{1b}[37m\u{1b}[40m",
            Level::Information => "\u{1b}[32m\u{1b}[40m",
            Level::Warning => "\u{1b}[1m\u{1b}[33m\u{1b}[40m",
            Level::Error => "\u{1b}[30m\u{1b}[41m",
            Level::Critical => "\u{1b}[1m\u{1b}[37m\u{1b}[41m",
            Level::None => "",
        }
    }
}

/// Colors modeled on NLog's colored console target.
pub struct NLogTheme;

impl Theme for NLogTheme {
    fn name(&self) -> &'static str {
        "NLog"
    }

    fn line_color(&self, level: Level) -> &'static str {
        self.level_color(level)
    }

    fn level_color(&self, level: Level) -> &'static str {
        match level {
            Level::Trace => "\u{1b}[90m\u{1b}[40m",
            Level::Debug => "\u{1b}[37m\u{1b}[40m",
            Level::Information => "\u{1b}[97m\u{1b}[40m",
            Level::Warning => "\u{1b}[95m\u{1b}[40m",
            Level::Error => "\u{1b}[93m\u{1b}[40m",
            Level::Critical => "\u{1b}[91m\u{1b}[40m",
            Level::None => "",
        }
    }
}

/// Colors modeled on Serilog's literate console sink.
pub struct SerilogTheme;

impl Theme for SerilogTheme {
    fn name(&self) -> &'static str {
        "Serilog"
    }

    fn line_color(&self, level: Level) -> &'static str {
        self.level_color(level)
    }

    fn level_color(&self, level: Level) -> &'static str {
        match level {
            Level::Trace | Level::Debug => "\u{1b}[38;5;0007m\u{1b}[40m",
            Level::Information => "\u{1b}[38;5;0015m\u{1b}[40m",
            Level::Warning => "\u{1b}[38;5;0011m\u{1b}[40m",
            Level::Error | Level::Critical => "\u{1b}[38;5;0015m\u{1b}[48;5;0196m",
            Level::None => "",
        }
    }

    fn category_color(&self, _category: &str) -> &'static str {
        "\u{1b}[38;5;0007m"
    }

    fn event_id_color(&self, _event_id: i64) -> &'static str {
        "\u{1b}[38;5;0007m"
    }

    fn message_color(&self, _message: &str) -> &'static str {
        "\u{1b}[38;5;0015m"
    }
}

/// Fallback theme whose every mapping is the empty code.
pub struct NoColorTheme;

impl Theme for NoColorTheme {
    fn name(&self) -> &'static str {
        "None"
    }

    fn line_color(&self, _level: Level) -> &'static str {
        ""
    }

    fn level_color(&self, _level: Level) -> &'static str {
        ""
    }
}

/// Whether the current environment can render colored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSupport {
    Color,
    NoColor,
}

impl ColorSupport {
    /// Environment probe: `NO_COLOR` set, or `TERM` empty or `dumb`,
    /// disables color.
    pub fn detect() -> ColorSupport {
        if env::var_os("NO_COLOR").is_some() {
            return ColorSupport::NoColor;
        }
        match env::var("TERM") {
            Ok(term) if term.is_empty() || term == "dumb" => ColorSupport::NoColor,
            Ok(_) => ColorSupport::Color,
            Err(_) => ColorSupport::Color,
        }
    }
}

/// Resolves the active [`Theme`] from configuration.
///
/// Holds the registered themes plus the current selection; [`reload`]
/// re-resolves by name and swaps the selection atomically, so formatters
/// holding the provider observe the change without re-acquiring anything.
///
/// [`reload`]: ThemeProvider::reload
pub struct ThemeProvider {
    themes: Vec<Arc<dyn Theme>>,
    current: RwLock<Arc<dyn Theme>>,
    color_support: ColorSupport,
}

impl ThemeProvider {
    /// Provider with the built-in themes (MEL, NLog, Serilog) and the
    /// detected color support, initially resolved to the default theme.
    pub fn new() -> Self {
        Self::with_themes(
            vec![
                Arc::new(MelTheme) as Arc<dyn Theme>,
                Arc::new(NLogTheme),
                Arc::new(SerilogTheme),
            ],
            ColorSupport::detect(),
        )
    }

    /// Provider over an explicit theme set; `color_support` overrides the
    /// environment probe (used by tests and headless embedders).
    pub fn with_themes(themes: Vec<Arc<dyn Theme>>, color_support: ColorSupport) -> Self {
        let provider = ThemeProvider {
            themes,
            current: RwLock::new(Arc::new(NoColorTheme)),
            color_support,
        };
        provider.reload(None);
        provider
    }

    /// The currently selected theme.
    pub fn current(&self) -> Arc<dyn Theme> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-resolve the selection. An unset name means the default (`MEL`);
    /// unknown names and colorless environments resolve to no-color.
    pub fn reload(&self, theme_name: Option<&str>) {
        let resolved = if self.color_support == ColorSupport::NoColor {
            Arc::new(NoColorTheme) as Arc<dyn Theme>
        } else {
            let name = match theme_name {
                Some(name) if !name.is_empty() => name,
                _ => "MEL",
            };
            self.themes
                .iter()
                .find(|theme| theme.name().eq_ignore_ascii_case(name))
                .cloned()
                .unwrap_or_else(|| Arc::new(NoColorTheme))
        };

        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = resolved;
    }
}

impl Default for ThemeProvider {
    fn default() -> Self {
        ThemeProvider::new()
    }
}
