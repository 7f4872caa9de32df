use gelf_handler::{Compression, GelfHandler, GelfLayer};
use tracing_subscriber::prelude::*;

fn main() {
    // Graylog address
    let handler = GelfHandler::builder()
        .compression(Compression::Gzip)
        .udp("127.0.0.1", 12201)
        .unwrap();

    // Start tracing
    tracing_subscriber::registry()
        .with(GelfLayer::new(handler))
        .init();

    // Send a log to Graylog
    tracing::info!(message = "our dreams feel real while we're in them");

    // Create a span
    let span = tracing::info_span!("level 1");
    span.in_scope(|| {
        // Log inside a span
        tracing::warn!(message = "we need to go deeper", music = "hans zimmer");

        // Create an nested span
        let inner_span = tracing::info_span!("level 5");
        inner_span.in_scope(|| {
            // Log inside nested span
            tracing::error!(message = "you killed me");
        });
    });

    // Log a structured log
    tracing::info!(message = "he's out", spinning_top = true);
}
