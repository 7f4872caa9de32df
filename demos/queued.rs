use std::{sync::Arc, time::Duration};

use gelf_handler::{GelfHandler, GelfLayer};
use tokio::time::sleep;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() {
    // Build a handler that queues datagrams, returning a connection handle
    let (handler, conn_handle) = GelfHandler::builder()
        .queued("127.0.0.1", 12201, 512)
        .unwrap();
    let handler = Arc::new(handler);

    tracing_subscriber::registry()
        .with(GelfLayer::new(handler.clone()))
        .init();

    // Reconnection loop
    let reconnect = async move {
        let mut conn_handle = conn_handle;

        loop {
            // Forward queued datagrams until the connection fails
            let errors = conn_handle.connect().await;

            // Process errors
            for (socket, error) in errors.0 {
                eprintln!("{}: {}", socket, error);
            }

            // Don't attempt reconnect immediately
            sleep(Duration::from_secs(5)).await;
        }
    };

    // Spawn background task
    tokio::spawn(reconnect);

    // Send a log to Graylog
    tracing::info!("one day");

    sleep(Duration::from_secs(1)).await;
    println!("{:?}", handler.stats());
}
