//! The fallback channel for messages that could not be shipped.

use std::{error::Error as _, io::Write};

use serde_json::json;

use crate::{error::Error, event::now};

/// Target of events emitted by [`TracingDiagnostics`].
///
/// [`GelfLayer`](crate::GelfLayer) skips this target so that a failing handler is not fed its own
/// failures.
pub const DIAGNOSTICS_TARGET: &str = "gelf_handler::diagnostics";

const DROPPED: &str = "dropped GELF message";

/// Receives every failure contained by a [`GelfHandler`](crate::GelfHandler).
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, error: &Error);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn emit(&self, error: &Error) {
        (self)(error)
    }
}

/// Writes one compact JSON line per failure to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl StderrDiagnostics {
    fn line(error: &Error) -> String {
        json!({
            "timestamp": now(),
            "level": "warn",
            "target": DIAGNOSTICS_TARGET,
            "message": DROPPED,
            "kind": error.kind(),
            "error": error_chain(error),
        })
        .to_string()
    }
}

impl DiagnosticSink for StderrDiagnostics {
    fn emit(&self, error: &Error) {
        // Nowhere left to report a failing stderr
        let _ = writeln!(std::io::stderr().lock(), "{}", Self::line(error));
    }
}

/// Reports failures as `tracing` warnings under [`DIAGNOSTICS_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&self, error: &Error) {
        tracing::warn!(
            target: DIAGNOSTICS_TARGET,
            kind = error.kind(),
            error = %error_chain(error),
            "{}",
            DROPPED
        );
    }
}

/// `outer: inner: ...`
fn error_chain(error: &Error) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        out.push_str(": ");
        out.push_str(&err.to_string());
        source = err.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn line_is_json() {
        let err = Error::Transport(io::Error::new(io::ErrorKind::Other, "network is down"));
        let line = StderrDiagnostics::line(&err);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["kind"], "transport");
        assert_eq!(value["error"], "failed to send datagram: network is down");
        assert_eq!(value["target"], DIAGNOSTICS_TARGET);
        assert!(!line.contains('\n'));
    }

    #[test]
    fn closures_are_sinks() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |err: &Error| seen.lock().unwrap().push(err.kind());
        sink.emit(&Error::Validation("short_message is empty"));
        assert_eq!(*seen.lock().unwrap(), vec!["validation"]);
    }
}
