use tracing_core::{Event, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::{
    diagnostics::DIAGNOSTICS_TARGET,
    event::{Level, LogEvent},
    handler::Handler,
    visitor::LogEventVisitor,
};

/// A [`Layer`] passing every `tracing` event to a [`Handler`].
///
/// ```no_run
/// use gelf_handler::{GelfHandler, GelfLayer};
/// use tracing_subscriber::prelude::*;
///
/// let handler = GelfHandler::builder().udp("127.0.0.1", 12201).unwrap();
/// tracing_subscriber::registry()
///     .with(GelfLayer::new(handler))
///     .init();
/// ```
#[derive(Debug)]
pub struct GelfLayer<H> {
    handler: H,
    spans: bool,
    file_names: bool,
    line_numbers: bool,
    module_paths: bool,
}

impl<H: Handler> GelfLayer<H> {
    pub fn new(handler: H) -> Self {
        GelfLayer {
            handler,
            spans: true,
            file_names: true,
            line_numbers: true,
            module_paths: true,
        }
    }

    /// Set whether the current span name is logged. Defaults to true.
    pub fn spans(mut self, value: bool) -> Self {
        self.spans = value;
        self
    }

    /// Set whether file names should be logged. Defaults to true.
    pub fn file_names(mut self, value: bool) -> Self {
        self.file_names = value;
        self
    }

    /// Set whether line numbers should be logged. Defaults to true.
    pub fn line_numbers(mut self, value: bool) -> Self {
        self.line_numbers = value;
        self
    }

    /// Set whether module paths should be logged. Defaults to true.
    pub fn module_paths(mut self, value: bool) -> Self {
        self.module_paths = value;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<S, H> Layer<S> for GelfLayer<H>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    H: Handler + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() == DIAGNOSTICS_TARGET {
            return;
        }

        let mut log_event =
            LogEvent::new(String::new()).with_level(Level::from(*metadata.level()));

        log_event
            .fields
            .insert("target".to_string(), metadata.target().into());
        if self.spans {
            if let Some(span) = ctx.event_span(event) {
                log_event
                    .fields
                    .insert("span".to_string(), span.name().into());
            }
        }
        if self.file_names {
            if let Some(file) = metadata.file() {
                log_event.fields.insert("file".to_string(), file.into());
            }
        }
        if self.line_numbers {
            if let Some(line) = metadata.line() {
                log_event.fields.insert("line".to_string(), line.into());
            }
        }
        if self.module_paths {
            if let Some(module_path) = metadata.module_path() {
                log_event
                    .fields
                    .insert("module_path".to_string(), module_path.into());
            }
        }

        // Event fields may override the metadata above
        event.record(&mut LogEventVisitor::new(&mut log_event));

        // Events made only of fields still get a message
        if log_event.short_message.trim().is_empty() {
            log_event.short_message = metadata.name().to_string();
        }

        self.handler.handle(log_event);
    }
}
