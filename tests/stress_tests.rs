//! Stress tests for concurrent logging and the bounded queue
//!
//! These tests verify:
//! - Critical entries are never dropped under heavy load
//! - Every buffered entry is either delivered or counted as dropped
//! - Shared loggers are safe across threads
//! - Derived loggers stay independent under concurrency

use gcloud_log_handler::prelude::*;
use gcloud_log_handler::FnSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn slow_counting_sink(counter: Arc<AtomicUsize>, delay: Duration) -> FnSink<impl Fn(Entry) + Send + Sync> {
    FnSink::new(move |_entry| {
        thread::sleep(delay);
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

/// Critical entries take the synchronous path and survive a full queue
#[test]
fn test_critical_entries_never_dropped() {
    let sink = Arc::new(MemorySink::new());
    let buffered = Arc::new(
        BufferedSink::builder(SlowSink {
            inner: sink.clone(),
            delay: Duration::from_millis(1),
        })
        .capacity(4)
        .build(),
    );
    let logger = Logger::new(CloudHandler::builder(buffered.clone()).log_level(Level::DEBUG).build());

    for i in 0..200 {
        logger.debug(format!("Debug message {}", i), []);
    }
    for i in 0..10 {
        logger.critical(format!("Critical error {}", i), []);
    }
    logger.flush().expect("Failed to flush");

    let critical: Vec<String> = sink
        .sync_entries()
        .iter()
        .map(|e| e.payload["message"].as_str().unwrap_or_default().to_string())
        .collect();
    for i in 0..10 {
        assert!(
            critical.contains(&format!("Critical error {}", i)),
            "Critical error {} was dropped!",
            i
        );
    }
    assert!(buffered.dropped_count() > 0, "Queue should have overflowed");
}

/// Delivered plus dropped always adds up to what was logged
#[test]
fn test_accounting_under_overflow() {
    let delivered = Arc::new(AtomicUsize::new(0));
    let overflows = Arc::new(AtomicUsize::new(0));
    let overflow_counter = Arc::clone(&overflows);

    let buffered = Arc::new(
        BufferedSink::builder(slow_counting_sink(delivered.clone(), Duration::from_micros(200)))
            .capacity(8)
            .on_overflow(Arc::new(move |_dropped| {
                overflow_counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build(),
    );
    let logger = Logger::new(CloudHandler::new(buffered.clone()));

    let total = 2_000;
    for i in 0..total {
        logger.info("burst", [Attribute::int("i", i)]);
    }
    logger.flush().expect("Failed to flush");

    let dropped = buffered.dropped_count() as usize;
    assert_eq!(delivered.load(Ordering::SeqCst) + dropped, total as usize);
    assert_eq!(buffered.metrics().delivered_count() as usize, total as usize - dropped);
    if dropped > 0 {
        assert!(overflows.load(Ordering::SeqCst) > 0);
    }
}

/// Many threads logging through one shared logger
#[test]
fn test_concurrent_logging() {
    let sink = Arc::new(MemorySink::new());
    let buffered = Arc::new(BufferedSink::builder(sink.clone()).capacity(10_000).build());
    let logger = Logger::new(CloudHandler::new(buffered.clone()));

    let threads = 8;
    let per_thread = 500;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let logger = logger.with([Attribute::int("thread", t)]);
            thread::spawn(move || {
                let ctx = Context::background().with_labels([("worker", t.to_string())]);
                for i in 0..per_thread {
                    logger.log(&ctx, Level::INFO, "work", [Attribute::int("i", i)]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    logger.flush().expect("Failed to flush");

    let entries = sink.entries();
    assert_eq!(entries.len(), (threads * per_thread) as usize);
    assert_eq!(buffered.dropped_count(), 0);

    for entry in &entries {
        let thread = entry.payload["thread"].as_f64().unwrap() as i64;
        assert_eq!(entry.labels["worker"], thread.to_string());
    }
}

/// Loggers derived concurrently from one parent never see each other's attributes
#[test]
fn test_concurrent_derivation_is_isolated() {
    let sink = Arc::new(MemorySink::new());
    let base = Logger::new(CloudHandler::new(sink.clone())).with_group("job");

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let base = base.clone();
            thread::spawn(move || {
                let child = base.with([Attribute::int("id", t)]);
                for _ in 0..50 {
                    child.info("tick", [Attribute::int("id_again", t)]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let entries = sink.entries();
    assert_eq!(entries.len(), 16 * 50);
    for entry in entries {
        let job = entry.payload["job"].as_object().unwrap();
        assert_eq!(job["id"], job["id_again"]);
        assert!(matches!(job["id"], StructuredValue::Number(_)));
    }
}

/// Shutdown under load drains what was queued
#[test]
fn test_shutdown_drains_queue() {
    let delivered = Arc::new(AtomicUsize::new(0));
    let buffered = BufferedSink::builder(slow_counting_sink(delivered.clone(), Duration::from_micros(50)))
        .capacity(1_000)
        .build();

    for _ in 0..500 {
        buffered.log(Entry::new(chrono::Utc::now(), Severity::INFO, Default::default()));
    }

    assert!(buffered.shutdown(Duration::from_secs(10)));
    assert!(!buffered.is_running());
    assert_eq!(
        delivered.load(Ordering::SeqCst) + buffered.dropped_count() as usize,
        500
    );
}

struct SlowSink {
    inner: Arc<MemorySink>,
    delay: Duration,
}

impl Sink for SlowSink {
    fn log(&self, entry: Entry) {
        thread::sleep(self.delay);
        self.inner.log(entry);
    }

    fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()> {
        self.inner.log_sync(ctx, entry)
    }

    fn name(&self) -> &str {
        "slow"
    }
}
