//! Basic handler usage example
//!
//! Writes structured entries to stdout with attributes, groups and levels.
//!
//! Run with: cargo run --example basic_usage

use gcloud_log_handler::prelude::*;
use gcloud_log_handler::{info, warn};
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== gcloud-log-handler - Basic Usage Example ===\n");

    let handler = CloudHandler::builder(JsonWriterSink::stdout())
        .log_level(Level::DEBUG)
        .add_source()
        .build();
    let logger = Logger::new(handler);

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message", []);
    logger.info("This is an info message", []);
    logger.notice("This is a notice message", []);
    logger.warn("This is a warning message", []);
    logger.error("This is an error message", []);
    logger.critical("This is a critical message", []);

    println!("\n2. Attributes and groups:");
    let http = logger
        .with([Attribute::string("service", "checkout")])
        .with_group("http");
    http.info(
        "request served",
        [
            Attribute::string("method", "POST"),
            Attribute::int("status", 201),
            Attribute::duration("latency", Duration::from_millis(42)),
        ],
    );

    println!("\n3. Macros:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port);
    warn!(logger, "Cache hit rate below {}%", 50);

    println!("\n4. Lazy values:");
    logger.info(
        "expensive value",
        [Attribute::lazy("report", || AttrValue::from("computed only when logged"))],
    );

    logger.flush()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
