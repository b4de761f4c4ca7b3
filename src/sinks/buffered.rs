//! Buffered sink with a background worker
//!
//! [`BufferedSink`] puts entries on a bounded queue and returns at once. A
//! worker thread drains the queue in batches into an inner transport sink.
//! Synchronous sends travel through the same queue, so they are delivered
//! after everything buffered before them, and the caller waits for the
//! worker's acknowledgement.

use crate::core::{Context, Entry, HandlerError, Result, Sink, SinkMetrics};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default time [`Drop`] waits for the worker to drain the queue
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Interval, in dropped entries, between overflow warnings
const ALERT_INTERVAL: u64 = 1000;

/// Called with the total number of dropped entries when an overflow alert fires
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

enum Message {
    Entry(Entry),
    Sync(Entry, Sender<Result<()>>),
    Flush(Sender<Result<()>>),
}

pub struct BufferedSink {
    sender: RwLock<Option<Sender<Message>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    metrics: Arc<SinkMetrics>,
    on_overflow: Option<OverflowCallback>,
    name: String,
}

impl BufferedSink {
    /// Buffer in front of `inner` with default capacity and batch size
    pub fn new(inner: impl Sink + 'static) -> Self {
        Self::builder(inner).build()
    }

    pub fn builder(inner: impl Sink + 'static) -> BufferedSinkBuilder {
        BufferedSinkBuilder::new(inner)
    }

    fn spawn(
        inner: Arc<dyn Sink>,
        capacity: usize,
        batch_size: usize,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        let (sender, receiver) = bounded(capacity);
        let metrics = Arc::new(SinkMetrics::new());
        let worker_metrics = Arc::clone(&metrics);
        let name = format!("buffered({})", inner.name());

        let handle = thread::spawn(move || {
            Self::run(inner.as_ref(), &receiver, batch_size.max(1), &worker_metrics);
        });

        Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
            metrics,
            on_overflow,
            name,
        }
    }

    fn run(inner: &dyn Sink, receiver: &Receiver<Message>, batch_size: usize, metrics: &SinkMetrics) {
        let mut batch = Vec::with_capacity(batch_size);

        // recv() fails only once every sender is gone and the queue is empty
        while let Ok(message) = receiver.recv() {
            batch.push(message);
            while batch.len() < batch_size {
                match receiver.try_recv() {
                    Ok(message) => batch.push(message),
                    Err(_) => break,
                }
            }

            for message in batch.drain(..) {
                Self::process(inner, message, metrics);
            }
        }

        if let Err(e) = inner.flush() {
            eprintln!("[LOGGER ERROR] Sink '{}' flush failed during shutdown: {}", inner.name(), e);
        }
    }

    /// Deliver one message, isolating the worker from a panicking transport
    fn process(inner: &dyn Sink, message: Message, metrics: &SinkMetrics) {
        match message {
            Message::Entry(entry) => {
                match catch_unwind(AssertUnwindSafe(|| inner.log(entry))) {
                    Ok(()) => {
                        metrics.record_delivered();
                    }
                    Err(panic_info) => {
                        metrics.record_failed();
                        eprintln!(
                            "[LOGGER CRITICAL] Sink '{}' panicked: {}. The worker continues.",
                            inner.name(),
                            panic_message(panic_info.as_ref())
                        );
                    }
                }
            }
            Message::Sync(entry, ack) => {
                let background = Context::background();
                let result = catch_unwind(AssertUnwindSafe(|| inner.log_sync(&background, entry)))
                    .unwrap_or_else(|panic_info| {
                        Err(HandlerError::sink(inner.name(), panic_message(panic_info.as_ref())))
                    });
                match &result {
                    Ok(()) => {
                        metrics.record_delivered();
                        metrics.record_sync_delivered();
                    }
                    Err(_) => {
                        metrics.record_failed();
                    }
                }
                // The caller may have stopped waiting.
                let _ = ack.send(result);
            }
            Message::Flush(ack) => {
                let result = catch_unwind(AssertUnwindSafe(|| inner.flush())).unwrap_or_else(
                    |panic_info| Err(HandlerError::sink(inner.name(), panic_message(panic_info.as_ref()))),
                );
                let _ = ack.send(result);
            }
        }
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    pub fn dropped_count(&self) -> u64 {
        self.metrics.dropped_count()
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Stop accepting entries and wait up to `timeout` for the queue to drain
    ///
    /// Returns `true` if the worker finished in time.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        drop(self.sender.write().take());

        let Some(handle) = self.worker.lock().take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[LOGGER ERROR] Worker of sink '{}' panicked during shutdown: {:?}",
                        self.name, e
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Worker of sink '{}' did not finish within {:?}. \
                     Some entries may be lost.",
                    self.name, timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    fn alert_and_drop(&self) {
        let dropped = self.metrics.record_dropped() + 1;
        if dropped == 1 || dropped % ALERT_INTERVAL == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue of sink '{}' full, {} entries dropped. \
                 Consider increasing the queue capacity.",
                self.name, dropped
            );
            if let Some(callback) = &self.on_overflow {
                callback(dropped);
            }
        }
    }

    /// Queue a message, waiting for room as long as `ctx` allows
    ///
    /// The lock is released before waiting so a concurrent shutdown is not
    /// held up by a full queue.
    fn send_blocking(&self, ctx: &Context, message: Message) -> Result<()> {
        let sender = self
            .sender
            .read()
            .clone()
            .ok_or(HandlerError::SinkStopped)?;
        ctx.send_to(&sender, message)
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl Sink for BufferedSink {
    /// Queue the entry; a full queue drops it
    fn log(&self, entry: Entry) {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            self.metrics.record_dropped();
            return;
        };

        match sender.try_send(Message::Entry(entry)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_full();
                self.alert_and_drop();
            }
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
            }
        }
    }

    /// Queue the entry and wait for its delivery
    ///
    /// Cancelling `ctx` while the queue is full abandons the entry. Once it
    /// is queued, cancelling stops the wait and the entry is still
    /// delivered.
    fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }
        let (ack, acked) = bounded(1);
        self.send_blocking(ctx, Message::Sync(entry, ack))?;
        ctx.wait_for(&acked)?
    }

    /// Wait until everything queued so far has reached the inner sink
    fn flush(&self) -> Result<()> {
        let (ack, acked) = bounded(1);
        self.send_blocking(&Context::background(), Message::Flush(ack))?;
        acked.recv().map_err(|_| HandlerError::SinkStopped)?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BufferedSink {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Sink '{}' shutting down with {} dropped entries (loss rate: {:.2}%)",
                self.name,
                dropped,
                self.metrics.loss_rate()
            );
        }
    }
}

impl fmt::Debug for BufferedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedSink")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Builder for [`BufferedSink`]
///
/// # Example
/// ```
/// use gcloud_log_handler::sinks::{BufferedSink, JsonWriterSink};
/// use std::sync::Arc;
///
/// let sink = BufferedSink::builder(JsonWriterSink::stdout())
///     .capacity(4096)
///     .batch_size(100)
///     .on_overflow(Arc::new(|dropped| eprintln!("ALERT: {} entries dropped", dropped)))
///     .build();
/// ```
pub struct BufferedSinkBuilder {
    inner: Arc<dyn Sink>,
    capacity: usize,
    batch_size: usize,
    on_overflow: Option<OverflowCallback>,
}

impl BufferedSinkBuilder {
    pub fn new(inner: impl Sink + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            on_overflow: None,
        }
    }

    /// Queue length; a capacity of zero makes every `log` a rendezvous
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    pub fn build(self) -> BufferedSink {
        BufferedSink::spawn(self.inner, self.capacity, self.batch_size, self.on_overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Map, Severity, StructuredValue};
    use crate::sinks::MemorySink;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn entry(n: usize) -> Entry {
        let mut payload = Map::new();
        payload.insert("n".into(), StructuredValue::Number(n as f64));
        Entry::new(Utc::now(), Severity::INFO, payload)
    }

    /// Transport that blocks until released
    struct Gate {
        open: Receiver<()>,
        inner: MemorySink,
    }

    impl Sink for Gate {
        fn log(&self, entry: Entry) {
            let _ = self.open.recv();
            self.inner.log(entry);
        }

        fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()> {
            let _ = self.open.recv();
            self.inner.log_sync(ctx, entry)
        }
    }

    struct Failing;

    impl Sink for Failing {
        fn log(&self, _entry: Entry) {
            panic!("transport down");
        }

        fn log_sync(&self, _ctx: &Context, _entry: Entry) -> Result<()> {
            Err(HandlerError::sink("failing", "transport down"))
        }
    }

    #[test]
    fn test_entries_reach_inner_in_order() {
        let inner = Arc::new(MemorySink::new());
        let sink = BufferedSink::new(Arc::clone(&inner));
        for i in 0..100 {
            sink.log(entry(i));
        }
        sink.flush().unwrap();

        let entries = inner.entries();
        assert_eq!(entries.len(), 100);
        for (i, e) in entries.iter().enumerate() {
            assert_eq!(e.payload["n"], StructuredValue::Number(i as f64));
        }
        assert_eq!(sink.metrics().delivered_count(), 100);
    }

    #[test]
    fn test_sync_waits_for_delivery() {
        let inner = Arc::new(MemorySink::new());
        let sink = BufferedSink::new(Arc::clone(&inner));
        sink.log(entry(0));
        sink.log_sync(&Context::background(), entry(1)).unwrap();

        // buffered entries queued before the sync one are already delivered
        assert_eq!(inner.entries().len(), 1);
        assert_eq!(inner.sync_entries().len(), 1);
        assert_eq!(sink.metrics().sync_delivered_count(), 1);
    }

    #[test]
    fn test_sync_error_is_returned() {
        let sink = BufferedSink::new(Failing);
        let result = sink.log_sync(&Context::background(), entry(0));
        assert!(matches!(result, Err(HandlerError::SinkDelivery { .. })));
        assert_eq!(sink.metrics().failed_count(), 1);
    }

    #[test]
    fn test_panicking_transport_does_not_kill_worker() {
        let sink = BufferedSink::new(Failing);
        sink.log(entry(0));
        assert!(sink.flush().is_ok());
        assert_eq!(sink.metrics().failed_count(), 1);
    }

    #[test]
    fn test_cancel_aborts_wait_not_send() {
        let (release, open) = bounded(0);
        let inner = MemorySink::new();
        let sink = Arc::new(BufferedSink::new(Gate { open, inner }));

        let (ctx, handle) = Context::background().with_cancel();
        let waiter = {
            let sink = Arc::clone(&sink);
            thread::spawn(move || sink.log_sync(&ctx, entry(0)))
        };
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert!(matches!(waiter.join().unwrap(), Err(HandlerError::Cancelled)));

        release.send(()).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.metrics().sync_delivered_count(), 1);
    }

    fn gated_full_sink(open: Receiver<()>) -> Arc<BufferedSink> {
        let sink = BufferedSink::builder(Gate {
            open,
            inner: MemorySink::new(),
        })
        .capacity(1)
        .batch_size(1)
        .build();

        // the worker holds the first entry at the gate, the queue the second
        sink.log(entry(0));
        thread::sleep(Duration::from_millis(20));
        sink.log(entry(1));
        Arc::new(sink)
    }

    #[test]
    fn test_cancel_while_queue_full() {
        let (release, open) = bounded(0);
        let sink = gated_full_sink(open);

        let (ctx, handle) = Context::background().with_cancel();
        let waiter = {
            let sink = Arc::clone(&sink);
            thread::spawn(move || sink.log_sync(&ctx, entry(2)))
        };
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert!(matches!(waiter.join().unwrap(), Err(HandlerError::Cancelled)));

        drop(release);
        assert!(sink.shutdown(Duration::from_secs(5)));
        assert_eq!(sink.metrics().sync_delivered_count(), 0);
    }

    #[test]
    fn test_deadline_while_queue_full() {
        let (release, open) = bounded(0);
        let sink = gated_full_sink(open);

        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        assert!(matches!(
            sink.log_sync(&ctx, entry(2)),
            Err(HandlerError::DeadlineExceeded)
        ));

        drop(release);
        assert!(sink.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_shutdown_not_blocked_by_waiting_sync() {
        let (release, open) = bounded(0);
        let sink = gated_full_sink(open);

        let waiter = {
            let sink = Arc::clone(&sink);
            thread::spawn(move || sink.log_sync(&Context::background(), entry(2)))
        };
        thread::sleep(Duration::from_millis(20));

        drop(release);
        assert!(sink.shutdown(Duration::from_secs(5)));
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_overflow_drops_and_alerts() {
        let (release, open) = bounded(0);
        let alerts = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&alerts);
        let sink = BufferedSink::builder(Gate {
            open,
            inner: MemorySink::new(),
        })
        .capacity(1)
        .batch_size(1)
        .on_overflow(Arc::new(move |dropped| {
            seen.store(dropped, Ordering::SeqCst);
        }))
        .build();

        // the worker holds one entry at the gate, the queue holds one more
        for i in 0..10 {
            sink.log(entry(i));
            thread::sleep(Duration::from_millis(2));
        }

        assert!(sink.dropped_count() >= 1);
        assert!(sink.metrics().queue_full_events() >= 1);
        assert_eq!(alerts.load(Ordering::SeqCst), 1);

        drop(release);
        assert!(sink.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let inner = Arc::new(MemorySink::new());
        let sink = BufferedSink::new(Arc::clone(&inner));
        for i in 0..500 {
            sink.log(entry(i));
        }
        assert!(sink.shutdown(Duration::from_secs(5)));
        assert!(!sink.is_running());
        assert_eq!(inner.entries().len(), 500);

        sink.log(entry(0));
        assert!(matches!(
            sink.log_sync(&Context::background(), entry(0)),
            Err(HandlerError::SinkStopped)
        ));
    }
}
