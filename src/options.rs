//! Configuration surface.
//!
//! All options structs are `serde`-deserializable so a nested key/value
//! configuration file binds directly onto them. Invalid values (a zero
//! queue length, an unsupported queue-full mode) are rejected when the
//! configuration is bound, not when the pipeline first hits them.

use crate::processor::QueueFullMode;
use crate::record::Level;
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Error produced while binding or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum OptionsError {
    #[error("max_queue_length must be larger than zero")]
    ZeroQueueLength,

    #[error("{0:?} is not a supported queue full mode")]
    UnsupportedQueueFullMode(String),
}

/// Options shared by every formatter variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatterOptions {
    /// Render the record's scope chain.
    pub include_scopes: bool,
    /// `chrono` format string; no timestamp is emitted when unset.
    pub timestamp_format: Option<String>,
    /// Render timestamps on the UTC clock instead of local time.
    pub use_utc_timestamp: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        FormatterOptions {
            include_scopes: false,
            timestamp_format: None,
            use_utc_timestamp: true,
        }
    }
}

impl FormatterOptions {
    /// Render `timestamp` per the configured format string, on the
    /// configured clock. `None` when no format is configured.
    pub fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> Option<String> {
        let format = self.timestamp_format.as_deref()?;
        let rendered = if self.use_utc_timestamp {
            timestamp.format(format).to_string()
        } else {
            timestamp.with_timezone(&Local).format(format).to_string()
        };
        Some(rendered)
    }
}

/// When the simple formatter colors its level token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBehavior {
    /// Platform default; for a UI-bound sink this means no color.
    #[default]
    Default,
    Enabled,
    Disabled,
}

/// Options for the `simple` formatter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimpleFormatterOptions {
    #[serde(flatten)]
    pub common: FormatterOptions,
    pub color_behavior: ColorBehavior,
    /// Collapse the whole record onto one physical line.
    pub single_line: bool,
}

/// Options for the `themed` formatter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemedFormatterOptions {
    #[serde(flatten)]
    pub common: FormatterOptions,
    /// Theme name, resolved case-insensitively; unset selects the default.
    pub theme: Option<String>,
    /// Wrap the entire line in the theme's line color instead of coloring
    /// each element.
    pub color_whole_line: bool,
}

/// Top-level options for the text view logging pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextViewOptions {
    /// Formatter selection; unknown or unset names fall back to `simple`.
    pub formatter_name: Option<String>,
    /// Minimum severity for categories without an override.
    pub min_level: Level,
    /// Per-category minimum severity, matched by longest category prefix.
    pub category_levels: BTreeMap<String, Level>,
    /// Lines each registered view retains before evicting the oldest.
    pub max_messages: usize,
    /// Queue capacity; must be larger than zero.
    pub max_queue_length: usize,
    pub queue_full_mode: QueueFullMode,
    pub simple: SimpleFormatterOptions,
    pub json: FormatterOptions,
    pub systemd: FormatterOptions,
    pub themed: ThemedFormatterOptions,
}

impl Default for TextViewOptions {
    fn default() -> Self {
        TextViewOptions {
            formatter_name: None,
            min_level: Level::Information,
            category_levels: BTreeMap::new(),
            max_messages: 100,
            max_queue_length: 2500,
            queue_full_mode: QueueFullMode::Wait,
            simple: SimpleFormatterOptions::default(),
            json: FormatterOptions::default(),
            systemd: FormatterOptions::default(),
            themed: ThemedFormatterOptions::default(),
        }
    }
}

impl TextViewOptions {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_queue_length == 0 {
            return Err(OptionsError::ZeroQueueLength);
        }
        Ok(())
    }
}

/// An atomically swapped options snapshot.
///
/// Consumers read the current snapshot per operation; a configuration
/// reload replaces it without touching the consumer's identity, so
/// in-flight work keeps the snapshot it started with.
#[derive(Debug)]
pub struct OptionsHandle<T> {
    inner: RwLock<Arc<T>>,
}

impl<T> OptionsHandle<T> {
    pub fn new(value: T) -> Self {
        OptionsHandle { inner: RwLock::new(Arc::new(value)) }
    }

    pub fn get(&self) -> Arc<T> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, value: T) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(value);
    }
}
