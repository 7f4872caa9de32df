use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{map::Map, Value};

/// Syslog severity, as carried by the GELF `level` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

const LEVELS: [Level; 8] = [
    Level::Emergency,
    Level::Alert,
    Level::Critical,
    Level::Error,
    Level::Warning,
    Level::Notice,
    Level::Informational,
    Level::Debug,
];

impl Level {
    /// Convert a raw syslog severity, clamping out-of-range values to the nearest bound.
    pub fn from_syslog(value: i64) -> Self {
        LEVELS[value.clamp(0, 7) as usize]
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Level> for i64 {
    fn from(level: Level) -> i64 {
        level.as_u8().into()
    }
}

impl From<tracing_core::Level> for Level {
    fn from(level: tracing_core::Level) -> Self {
        match level {
            tracing_core::Level::ERROR => Level::Error,
            tracing_core::Level::WARN => Level::Warning,
            tracing_core::Level::INFO => Level::Informational,
            tracing_core::Level::DEBUG => Level::Debug,
            tracing_core::Level::TRACE => Level::Debug,
        }
    }
}

/// A single log call, as handed to a [`Handler`](crate::Handler).
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Raw syslog severity. Clamped to `0..=7` when encoded.
    pub level: Option<i64>,
    pub short_message: String,
    pub full_message: Option<String>,
    /// Source host. The handler's host is used when unset.
    pub host: Option<String>,
    /// Additional fields. Keys are written with a leading `_`.
    pub fields: Map<String, Value>,
}

impl LogEvent {
    /// Create an event stamped with the current time.
    pub fn new<S: Into<String>>(short_message: S) -> Self {
        LogEvent {
            timestamp: now(),
            level: None,
            short_message: short_message.into(),
            full_message: None,
            host: None,
            fields: Map::new(),
        }
    }

    pub fn with_level<L: Into<i64>>(mut self, level: L) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_full_message<S: Into<String>>(mut self, full_message: S) -> Self {
        self.full_message = Some(full_message.into());
        self
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Add an additional field.
    pub fn with_field<K: ToString, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

pub(crate) fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
