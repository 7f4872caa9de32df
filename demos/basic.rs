use gelf_handler::{GelfHandler, Handler, LogEvent};

fn main() {
    // Graylog address
    let handler = GelfHandler::builder()
        .additional_field("service", "demo")
        .udp("127.0.0.1", 12201)
        .unwrap();

    // Send a log to Graylog
    handler.handle(LogEvent::new("Hello, Graylog!").with_level(6));

    // Log a structured log
    handler.handle(
        LogEvent::new("i'm glad to be out")
            .with_level(5)
            .with_field("spook_lvl", 3)
            .with_field("ruck_sack", "glasses, inhaler, large bat"),
    );

    println!("{:?}", handler.stats());
}
