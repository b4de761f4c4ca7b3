//! Buffered logging example
//!
//! Entries are queued and written to a file by a background worker.
//! Critical entries wait until they are written.
//!
//! Run with: cargo run --example buffered_logging

use gcloud_log_handler::prelude::*;
use std::sync::Arc;
use std::thread;

fn main() -> Result<()> {
    println!("=== gcloud-log-handler - Buffered Logging Example ===\n");

    let path = std::env::temp_dir().join("gcloud_log_handler_buffered.jsonl");
    let file = JsonWriterSink::file(&path)?;
    let buffered = Arc::new(
        BufferedSink::builder(file)
            .capacity(512)
            .batch_size(32)
            .on_overflow(Arc::new(|dropped| {
                eprintln!("queue full, {} entries dropped so far", dropped);
            }))
            .build(),
    );

    let handler = CloudHandler::builder(buffered.clone())
        .log_level_from_env()
        .default_log_level(Level::INFO)
        .build();
    let logger = Logger::new(handler);

    println!("Logging from 4 threads...");
    let workers: Vec<_> = (0..4)
        .map(|id| {
            let logger = logger.with([Attribute::int("worker", id)]);
            thread::spawn(move || {
                for i in 0..100 {
                    logger.info("processed item", [Attribute::int("item", i)]);
                }
            })
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }

    logger.critical("shutting down", []);
    logger.flush()?;

    let metrics = buffered.metrics();
    println!("Delivered: {}", metrics.delivered_count());
    println!("Dropped:   {}", metrics.dropped_count());
    println!("Written to {}", path.display());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
