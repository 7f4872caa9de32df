//! A best-effort [GELF](https://go2docs.graylog.org/current/getting_in_log_data/gelf.html)
//! handler shipping log events to Graylog over UDP.
//!
//! A [`GelfHandler`] turns each [`LogEvent`] into a GELF message, optionally compresses it,
//! splits it into chunks when it does not fit one datagram, and sends it. Logging is
//! fire-and-forget: a message that cannot be encoded or sent is dropped and reported to a
//! [`DiagnosticSink`], never to the caller.
//!
//! ```no_run
//! use gelf_handler::{GelfHandler, Handler, LogEvent};
//!
//! let handler = GelfHandler::builder()
//!     .additional_field("service", "billing")
//!     .udp("127.0.0.1", 12201)
//!     .unwrap();
//!
//! handler.handle(LogEvent::new("Hello, Graylog!").with_level(6));
//! ```
//!
//! With `tracing`, register a [`GelfLayer`]. To move network I/O off the logging thread, build
//! with [`Builder::queued`] and drive the returned [`ConnectionHandle`] from a task.

pub mod chunk;
pub mod compression;
pub mod config;
mod connection;
pub mod diagnostics;
pub mod encoder;
mod error;
mod event;
mod handler;
mod layer;
mod visitor;

pub use compression::Compression;
pub use config::{Config, ConfigError};
pub use connection::*;
pub use diagnostics::{DiagnosticSink, StderrDiagnostics, TracingDiagnostics};
pub use encoder::{GelfRecord, MessageEncoder};
pub use error::{BuildError, Error};
pub use event::{Level, LogEvent};
pub use handler::{Builder, GelfHandler, Handler, HandlerStats};
pub use layer::GelfLayer;
