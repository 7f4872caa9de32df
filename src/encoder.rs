use serde::{Deserialize, Serialize};
use serde_json::{map::Map, Value};

use crate::error::Error;
use crate::event::{Level, LogEvent};

pub const GELF_VERSION: &str = "1.1";

/// The on-wire GELF structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GelfRecord {
    pub version: String,
    pub host: String,
    pub short_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// `_`-prefixed additional fields.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl GelfRecord {
    /// Decode an uncompressed, unchunked payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|err| Error::Encoding(err.into()))
    }
}

/// Builds GELF records from log events.
#[derive(Debug, Clone)]
pub struct MessageEncoder {
    host: String,
    additional_fields: Map<String, Value>,
}

impl MessageEncoder {
    /// `host` is used for events that carry no host of their own.
    pub fn new<S: Into<String>>(host: S) -> Self {
        MessageEncoder {
            host: host.into(),
            additional_fields: Map::new(),
        }
    }

    /// Add a field included in every message. Fields on the event take precedence.
    pub fn additional_field<K: ToString, V: Into<Value>>(&mut self, key: K, value: V) -> &mut Self {
        self.additional_fields.insert(key.to_string(), value.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn record(&self, event: &LogEvent) -> Result<GelfRecord, Error> {
        if event.short_message.trim().is_empty() {
            return Err(Error::Validation("short_message is empty"));
        }

        let host = match event.host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => self.host.clone(),
        };

        // Receivers stamp messages themselves when this is missing
        let timestamp = Some(event.timestamp).filter(|ts| ts.is_finite() && *ts >= 0.);

        let mut additional = Map::with_capacity(self.additional_fields.len() + event.fields.len());
        for (key, value) in self.additional_fields.iter().chain(event.fields.iter()) {
            if let Some((key, value)) = additional_field(key, value) {
                additional.insert(key, value);
            }
        }

        Ok(GelfRecord {
            version: GELF_VERSION.to_string(),
            host,
            short_message: event.short_message.clone(),
            full_message: event.full_message.clone(),
            timestamp,
            level: event.level.map(|level| Level::from_syslog(level).as_u8()),
            additional,
        })
    }

    /// Serialize an event to compact JSON.
    pub fn encode(&self, event: &LogEvent) -> Result<Vec<u8>, Error> {
        let record = self.record(event)?;
        serde_json::to_vec(&record).map_err(|err| Error::Encoding(err.into()))
    }
}

/// Normalize one additional field, or `None` if it must not be sent.
fn additional_field(key: &str, value: &Value) -> Option<(String, Value)> {
    let name = key.strip_prefix('_').unwrap_or(key);
    // `_id` is reserved by the receiver
    if name.is_empty() || name == "id" {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return None;
    }

    let value = match value {
        Value::Null => return None,
        Value::String(_) | Value::Number(_) => value.clone(),
        // Booleans are not valid under GELF
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
    };

    Some((format!("_{}", name), value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn encoder() -> MessageEncoder {
        MessageEncoder::new("local")
    }

    #[test]
    fn round_trip() {
        let event = LogEvent::new("disk almost full")
            .with_level(4)
            .with_timestamp(1_700_000_000.25)
            .with_full_message("/var is at 97%")
            .with_field("mount", "/var")
            .with_field("used_pct", 97);

        let bytes = encoder().encode(&event).unwrap();
        let record = GelfRecord::from_slice(&bytes).unwrap();

        assert_eq!(record.version, "1.1");
        assert_eq!(record.host, "local");
        assert_eq!(record.short_message, "disk almost full");
        assert_eq!(record.full_message.as_deref(), Some("/var is at 97%"));
        assert_eq!(record.timestamp, Some(1_700_000_000.25));
        assert_eq!(record.level, Some(4));
        assert_eq!(record.additional["_mount"], "/var");
        assert_eq!(record.additional["_used_pct"], 97);
    }

    #[test]
    fn empty_message_is_rejected() {
        let err = encoder().encode(&LogEvent::new("  ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn level_is_clamped() {
        let high = encoder().record(&LogEvent::new("x").with_level(99)).unwrap();
        let low = encoder().record(&LogEvent::new("x").with_level(-1)).unwrap();
        assert_eq!(high.level, Some(7));
        assert_eq!(low.level, Some(0));
    }

    #[test]
    fn event_host_overrides_default() {
        let record = encoder().record(&LogEvent::new("x").with_host("x")).unwrap();
        assert_eq!(record.host, "x");

        let record = encoder().record(&LogEvent::new("x").with_host("")).unwrap();
        assert_eq!(record.host, "local");
    }

    #[test]
    fn reserved_and_invalid_fields_are_dropped() {
        let event = LogEvent::new("x")
            .with_field("id", 1)
            .with_field("_id", 2)
            .with_field("bad key", 3)
            .with_field("nothing", Value::Null)
            .with_field("_kept", 4);

        let record = encoder().record(&event).unwrap();
        assert_eq!(record.additional.len(), 1);
        assert_eq!(record.additional["_kept"], 4);
    }

    #[test]
    fn values_are_coerced() {
        let event = LogEvent::new("x")
            .with_field("ok", true)
            .with_field("tags", json!(["a", "b"]));

        let record = encoder().record(&event).unwrap();
        assert_eq!(record.additional["_ok"], "true");
        assert_eq!(record.additional["_tags"], r#"["a","b"]"#);
    }

    #[test]
    fn event_fields_override_persistent_ones() {
        let mut encoder = encoder();
        encoder
            .additional_field("env", "prod")
            .additional_field("region", "eu");

        let record = encoder
            .record(&LogEvent::new("x").with_field("region", "us"))
            .unwrap();
        assert_eq!(record.additional["_env"], "prod");
        assert_eq!(record.additional["_region"], "us");
    }

    #[test]
    fn bad_timestamp_is_omitted() {
        let record = encoder()
            .record(&LogEvent::new("x").with_timestamp(f64::NAN))
            .unwrap();
        assert_eq!(record.timestamp, None);
    }

    #[test]
    fn encoding_is_deterministic() {
        let event = LogEvent::new("x")
            .with_timestamp(1.5)
            .with_field("b", 1)
            .with_field("a", 2);
        assert_eq!(encoder().encode(&event).unwrap(), encoder().encode(&event).unwrap());
    }
}
