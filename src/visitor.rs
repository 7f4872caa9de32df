use std::fmt;

use serde_json::Value;
use tracing_core::field::{Field, Visit};

use crate::event::LogEvent;

/// Copies `tracing` fields into a [`LogEvent`].
///
/// GELF's own field names fill the matching event slots; everything else becomes an additional
/// field.
pub struct LogEventVisitor<'a> {
    event: &'a mut LogEvent,
}

impl<'a> LogEventVisitor<'a> {
    pub fn new(event: &'a mut LogEvent) -> Self {
        LogEventVisitor { event }
    }

    fn record_additional_value<V: Into<Value>>(&mut self, field: &str, value: V) {
        self.event.fields.insert(field.to_string(), value.into());
    }

    fn record_text(&mut self, field: &str, value: String) {
        match field {
            // "message" -> "short_message"
            "message" | "short_message" => self.event.short_message = value,
            "full_message" => self.event.full_message = Some(value),
            "host" => self.event.host = Some(value),
            // GELF requires level: Integer
            "level" => {
                // Ignore if can't coerce
                if let Ok(ok) = value.trim().parse::<i64>() {
                    self.event.level = Some(ok);
                }
            }
            "timestamp" => {
                if let Ok(ok) = value.trim().parse::<f64>() {
                    self.event.timestamp = ok;
                }
            }
            _ => self.record_additional_value(field, value),
        }
    }
}

impl<'a> Visit for LogEventVisitor<'a> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_text(field.name(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "level" => self.event.level = Some(value),
            "timestamp" => self.event.timestamp = value as f64,
            "message" | "short_message" | "full_message" | "host" => {
                self.record_text(field.name(), value.to_string())
            }
            name => self.record_additional_value(name, value),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "level" => self.event.level = Some(i64::try_from(value).unwrap_or(i64::MAX)),
            "timestamp" => self.event.timestamp = value as f64,
            "message" | "short_message" | "full_message" | "host" => {
                self.record_text(field.name(), value.to_string())
            }
            name => self.record_additional_value(name, value),
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "timestamp" => self.event.timestamp = value,
            // Do not coerce floats into level
            "level" => {}
            "message" | "short_message" | "full_message" | "host" => {
                self.record_text(field.name(), value.to_string())
            }
            // NaN and infinities have no JSON form
            name => match serde_json::Number::from_f64(value) {
                Some(number) => self.record_additional_value(name, number),
                None => self.record_additional_value(name, value.to_string()),
            },
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            // Do not coerce bool into level or timestamp
            "level" | "timestamp" => {}
            name => self.record_text(name, value.to_string()),
        }
    }
}
