use crate::formatter::FormatterRegistry;
use crate::options::OptionsHandle;
use crate::processor::LogProcessor;
use crate::record::{ErrorDetails, Level, LogRecord, ScopeEntry};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Minimum-severity rules: a default level plus per-category overrides
/// matched by longest category prefix.
#[derive(Debug, Clone)]
pub struct SeverityFilter {
    default_level: Level,
    /// Sorted longest-prefix-first so the first match wins.
    category_levels: Vec<(String, Level)>,
}

impl SeverityFilter {
    pub fn new(default_level: Level, overrides: impl IntoIterator<Item = (String, Level)>) -> Self {
        let mut category_levels: Vec<(String, Level)> = overrides.into_iter().collect();
        category_levels.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        SeverityFilter { default_level, category_levels }
    }

    pub fn min_level_for(&self, category: &str) -> Level {
        self.category_levels
            .iter()
            .find(|(prefix, _)| category.starts_with(prefix.as_str()))
            .map(|(_, level)| *level)
            .unwrap_or(self.default_level)
    }

    pub fn enabled(&self, level: Level, category: &str) -> bool {
        level != Level::None && level >= self.min_level_for(category)
    }
}

impl Default for SeverityFilter {
    fn default() -> Self {
        SeverityFilter::new(Level::Information, [])
    }
}

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// feeds them through the formatter into the delivery queue.
///
/// The active span chain becomes the record's scope chain (outermost
/// first); span fields are captured when the span is created and merged on
/// later `record` calls. Formatting happens on the producer thread, so
/// only the finished line crosses into the queue.
pub struct TextViewLayer {
    processor: Arc<LogProcessor>,
    formatters: Arc<FormatterRegistry>,
    filter: Arc<OptionsHandle<SeverityFilter>>,
}

impl TextViewLayer {
    pub fn new(
        processor: Arc<LogProcessor>,
        formatters: Arc<FormatterRegistry>,
        filter: Arc<OptionsHandle<SeverityFilter>>,
    ) -> Self {
        TextViewLayer { processor, formatters, filter }
    }
}

fn convert_level(level: &tracing::Level) -> Level {
    // `tracing` has no Critical; it stays reachable through direct
    // `LogRecord` construction.
    if *level == tracing::Level::TRACE {
        Level::Trace
    } else if *level == tracing::Level::DEBUG {
        Level::Debug
    } else if *level == tracing::Level::INFO {
        Level::Information
    } else if *level == tracing::Level::WARN {
        Level::Warning
    } else {
        Level::Error
    }
}

/// Span fields captured into the registry's span extensions.
struct ScopeFields {
    name: &'static str,
    values: Vec<(String, Value)>,
}

impl ScopeFields {
    fn to_entry(&self) -> ScopeEntry {
        if self.values.is_empty() {
            return ScopeEntry::Text(self.name.to_string());
        }
        let rendered: Vec<String> = self
            .values
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        ScopeEntry::KeyValues {
            message: format!("{}{{{}}}", self.name, rendered.join(" ")),
            values: self.values.clone(),
        }
    }
}

/// Collects span fields as typed values.
struct ScopeVisitor<'a> {
    values: &'a mut Vec<(String, Value)>,
}

impl ScopeVisitor<'_> {
    fn push(&mut self, field: &Field, value: Value) {
        self.values.retain(|(name, _)| name != field.name());
        self.values.push((field.name().to_string(), value));
    }
}

impl Visit for ScopeVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, Value::String(format!("{value:?}")));
    }
}

/// Collects event fields, routing the well-known ones (`message`,
/// `event_id`, `error`) into their dedicated record slots.
struct EventVisitor<'a> {
    message: &'a mut Option<String>,
    event_id: &'a mut i64,
    error: &'a mut Option<ErrorDetails>,
    fields: &'a mut Vec<(String, Value)>,
}

impl Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            "error" | "exception" => *self.error = Some(ErrorDetails::new(value)),
            name => self.fields.push((name.to_string(), Value::String(value.to_string()))),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "event_id" {
            *self.event_id = value;
        } else {
            self.fields.push((field.name().to_string(), Value::from(value)));
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "event_id" {
            *self.event_id = value as i64;
        } else {
            self.fields.push((field.name().to_string(), Value::from(value)));
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.push((field.name().to_string(), Value::from(value)));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        // Flatten the source chain; everything below the top message
        // renders like a backtrace.
        let mut chain = Vec::new();
        let mut source = value.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        *self.error = Some(ErrorDetails {
            message: value.to_string(),
            backtrace: if chain.is_empty() { None } else { Some(chain.join("\n")) },
        });
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => *self.message = Some(format!("{value:?}")),
            "error" | "exception" => *self.error = Some(ErrorDetails::new(format!("{value:?}"))),
            name => self.fields.push((name.to_string(), Value::String(format!("{value:?}")))),
        }
    }
}

impl<S> Layer<S> for TextViewLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut values = Vec::new();
        attrs.record(&mut ScopeVisitor { values: &mut values });
        span.extensions_mut().insert(ScopeFields { name: attrs.metadata().name(), values });
    }

    fn on_record(&self, id: &Id, record: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<ScopeFields>() {
            record.record(&mut ScopeVisitor { values: &mut fields.values });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = convert_level(metadata.level());
        let category = metadata.target();
        if !self.filter.get().enabled(level, category) {
            return;
        }

        let mut message = None;
        let mut event_id = 0;
        let mut error = None;
        let mut fields = Vec::new();
        event.record(&mut EventVisitor {
            message: &mut message,
            event_id: &mut event_id,
            error: &mut error,
            fields: &mut fields,
        });

        let mut scopes = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                match extensions.get::<ScopeFields>() {
                    Some(captured) => scopes.push(captured.to_entry()),
                    None => scopes.push(ScopeEntry::Text(span.name().to_string())),
                }
            }
        }

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            category: category.to_string(),
            event_id,
            message: message.unwrap_or_default(),
            error,
            fields,
            scopes,
        };

        match self.formatters.current().format(&record) {
            Ok(Some(line)) => self.processor.enqueue(line),
            Ok(None) => {}
            Err(format_error) => {
                eprintln!("dropping unformattable log record: {format_error}");
            }
        }
    }
}
