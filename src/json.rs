//! The `json` formatter: one self-describing object per line.
//!
//! Line-join policy: newlines inside messages survive as `\n` escapes in
//! the JSON string encoding, so the physical output stays single-line.

use crate::formatter::{is_suppressed, names, FormatError, Formatter};
use crate::options::{FormatterOptions, OptionsHandle};
use crate::record::{Level, LogRecord, ScopeEntry};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct JsonFormatter {
    options: Arc<OptionsHandle<FormatterOptions>>,
}

impl JsonFormatter {
    pub fn new(options: Arc<OptionsHandle<FormatterOptions>>) -> Self {
        JsonFormatter { options }
    }
}

fn level_name(level: Level) -> Result<&'static str, FormatError> {
    match level {
        Level::None => Err(FormatError::UnloggableLevel(Level::None)),
        other => Ok(other.as_str()),
    }
}

fn scope_value(scope: &ScopeEntry) -> Value {
    match scope {
        ScopeEntry::Text(text) => Value::String(text.clone()),
        ScopeEntry::KeyValues { message, values } => {
            let mut object = Map::new();
            object.insert("Message".into(), Value::String(message.clone()));
            for (key, value) in values {
                object.insert(key.clone(), value.clone());
            }
            Value::Object(object)
        }
    }
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &'static str {
        names::JSON
    }

    fn format(&self, record: &LogRecord) -> Result<Option<String>, FormatError> {
        if is_suppressed(record) {
            return Ok(None);
        }
        let level = level_name(record.level)?;
        let options = self.options.get();

        let mut object = Map::new();
        if let Some(timestamp) = options.format_timestamp(&record.timestamp) {
            object.insert("Timestamp".into(), Value::String(timestamp));
        }
        object.insert("EventId".into(), json!(record.event_id));
        object.insert("LogLevel".into(), Value::String(level.into()));
        object.insert("Category".into(), Value::String(record.category.clone()));
        object.insert("Message".into(), Value::String(record.message.clone()));

        if let Some(error) = &record.error {
            object.insert("Exception".into(), Value::String(error.display()));
        }

        // State carries the rendered message plus the event's structured
        // fields in their natural (typed) representation.
        let mut state = Map::new();
        state.insert("Message".into(), Value::String(record.message.clone()));
        for (key, value) in &record.fields {
            state.insert(key.clone(), value.clone());
        }
        object.insert("State".into(), Value::Object(state));

        if options.include_scopes {
            let scopes: Vec<Value> = record.scopes.iter().map(scope_value).collect();
            object.insert("Scopes".into(), Value::Array(scopes));
        }

        let mut out = Value::Object(object).to_string();
        out.push('\n');
        Ok(Some(out))
    }
}
