use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::Value;

use crate::{
    chunk::{self, CHUNK_HEADER_SIZE, DEFAULT_MAX_CHUNK_SIZE},
    compression::Compression,
    config::Config,
    connection::{ConnectionHandle, QueuedTransport, Transport, TransportTarget, UdpTransport},
    diagnostics::{DiagnosticSink, StderrDiagnostics},
    encoder::MessageEncoder,
    error::{BuildError, Error},
    event::LogEvent,
};

/// The extension point a logging facility calls once per log call.
///
/// Implementations must not panic and must not block the caller on I/O.
pub trait Handler: Send + Sync {
    fn handle(&self, event: LogEvent);
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, event: LogEvent) {
        (**self).handle(event)
    }
}

/// Counters of a [`GelfHandler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Events passed to [`Handler::handle`].
    pub handled: u64,
    /// Datagrams handed to the transport. With a [`QueuedTransport`] this counts datagrams
    /// enqueued for the [`ConnectionHandle`], not datagrams already on the wire.
    pub datagrams_sent: u64,
    /// Events dropped because of a contained failure.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    handled: AtomicU64,
    datagrams_sent: AtomicU64,
    dropped: AtomicU64,
}

/// Ships log events to Graylog as GELF over UDP.
///
/// Each call encodes the event, compresses and chunks it, and hands the datagrams to the
/// transport. Any failure is reported to the diagnostics sink and the event is dropped.
pub struct GelfHandler<T = UdpTransport> {
    encoder: MessageEncoder,
    compression: Compression,
    max_chunk_size: usize,
    transport: T,
    diagnostics: Arc<dyn DiagnosticSink>,
    counters: Counters,
}

impl GelfHandler {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Build a handler sending directly over UDP from `config`.
    pub fn from_config(config: &Config) -> Result<GelfHandler, BuildError> {
        Builder::from_config(config).udp(config.host.clone(), config.port)
    }
}

impl<T: Transport> GelfHandler<T> {
    /// Run the pipeline, returning the number of datagrams sent.
    pub fn try_handle(&self, event: &LogEvent) -> Result<usize, Error> {
        let payload = self.encoder.encode(event)?;
        let payload = self.compression.compress(payload)?;
        let chunks = chunk::split(&payload, self.max_chunk_size)?;
        self.transport.send(chunks)
    }

    pub fn stats(&self) -> HandlerStats {
        HandlerStats {
            handled: self.counters.handled.load(Ordering::Relaxed),
            datagrams_sent: self.counters.datagrams_sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Handler for GelfHandler<T> {
    fn handle(&self, event: LogEvent) {
        self.counters.handled.fetch_add(1, Ordering::Relaxed);
        match self.try_handle(&event) {
            Ok(sent) => {
                self.counters
                    .datagrams_sent
                    .fetch_add(sent as u64, Ordering::Relaxed);
            }
            Err(err) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.emit(&err);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for GelfHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GelfHandler")
            .field("encoder", &self.encoder)
            .field("compression", &self.compression)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Builds a [`GelfHandler`].
pub struct Builder {
    additional_fields: Vec<(String, Value)>,
    source_host: Option<String>,
    max_chunk_size: usize,
    compression: Compression,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            additional_fields: Vec::new(),
            source_host: None,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            compression: Compression::None,
            diagnostics: Arc::new(StderrDiagnostics),
        }
    }
}

impl Builder {
    /// Start from the options in `config`. The target is supplied to [`Builder::udp`] or
    /// [`Builder::queued`].
    pub fn from_config(config: &Config) -> Self {
        let builder = Builder::default()
            .max_chunk_size(config.max_chunk_size)
            .compression(config.compression);
        match &config.source_host {
            Some(host) => builder.source_host(host.clone()),
            None => builder,
        }
    }

    /// Add a persistent additional field to the GELF messages.
    pub fn additional_field<K: ToString, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.additional_fields.push((key.to_string(), value.into()));
        self
    }

    /// Set the `host` of messages whose event has none. Defaults to the local hostname, which is
    /// also used when `host` is empty.
    pub fn source_host<S: Into<String>>(mut self, host: S) -> Self {
        self.source_host = Some(host.into());
        self
    }

    /// Set the largest datagram sent. Defaults to 1420 bytes.
    pub fn max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Set the payload compression. Defaults to none.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set where contained failures are reported. Defaults to [`StderrDiagnostics`].
    pub fn diagnostics<D: DiagnosticSink + 'static>(mut self, diagnostics: D) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    /// Build a handler that sends from the calling thread.
    pub fn udp<S: Into<String>>(self, host: S, port: u16) -> Result<GelfHandler, BuildError> {
        let target = TransportTarget::new(host, port);
        self.build(UdpTransport::new(target))
    }

    /// Build a handler that queues up to `buffer` datagrams for a [`ConnectionHandle`].
    ///
    /// The handle must be driven, usually from a spawned task, for anything to be sent.
    pub fn queued<S: Into<String>>(
        self,
        host: S,
        port: u16,
        buffer: usize,
    ) -> Result<(GelfHandler<QueuedTransport>, ConnectionHandle), BuildError> {
        let target = TransportTarget::new(host, port);
        let (transport, handle) = ConnectionHandle::new(target, buffer.max(1));
        Ok((self.build(transport)?, handle))
    }

    fn build<T: Transport>(self, transport: T) -> Result<GelfHandler<T>, BuildError> {
        if self.max_chunk_size <= CHUNK_HEADER_SIZE {
            return Err(BuildError::ChunkSizeTooSmall(self.max_chunk_size));
        }

        // An empty source host counts as unset
        let host = match self.source_host.filter(|host| !host.trim().is_empty()) {
            Some(host) => host,
            None => hostname::get()
                .map_err(BuildError::HostnameResolution)?
                .into_string()
                .map_err(BuildError::OsString)?,
        };

        let mut encoder = MessageEncoder::new(host);
        for (key, value) in self.additional_fields {
            encoder.additional_field(key, value);
        }

        Ok(GelfHandler {
            encoder,
            compression: self.compression,
            max_chunk_size: self.max_chunk_size,
            transport,
            diagnostics: self.diagnostics,
            counters: Counters::default(),
        })
    }
}
