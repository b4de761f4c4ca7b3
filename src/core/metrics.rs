//! Sink metrics for observability
//!
//! Counters for monitoring delivery health: delivered and failed entries,
//! entries dropped on a full queue, and how often the queue filled up.

use std::sync::atomic::{AtomicU64, Ordering};

/// Delivery counters of a sink
///
/// # Example
///
/// ```
/// use gcloud_log_handler::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_delivered();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.delivered_count(), 1);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Entries handed to the transport successfully
    delivered: AtomicU64,

    /// Entries the transport rejected
    failed: AtomicU64,

    /// Entries discarded because the queue was full
    dropped: AtomicU64,

    queue_full_events: AtomicU64,

    /// Entries delivered through the synchronous path
    sync_delivered: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            sync_delivered: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sync_delivered_count(&self) -> u64 {
        self.sync_delivered.load(Ordering::Relaxed)
    }

    /// Record a delivered entry, returning the previous count
    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sync_delivered(&self) -> u64 {
        self.sync_delivered.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of entries lost to a full queue or a failing transport, as a
    /// percentage
    ///
    /// Returns 0.0 if nothing has been processed.
    pub fn loss_rate(&self) -> f64 {
        let lost = (self.dropped_count() + self.failed_count()) as f64;
        let total = self.delivered_count() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.delivered.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.sync_delivered.store(0, Ordering::Relaxed);
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SinkMetrics {
    /// Create a snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            delivered: AtomicU64::new(self.delivered_count()),
            failed: AtomicU64::new(self.failed_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            sync_delivered: AtomicU64::new(self.sync_delivered_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.delivered_count(), 0);
        assert_eq!(metrics.failed_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.queue_full_events(), 0);
        assert_eq!(metrics.sync_delivered_count(), 0);
    }

    #[test]
    fn test_record_returns_previous() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_loss_rate() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.loss_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_delivered();
        }
        for _ in 0..5 {
            metrics.record_dropped();
            metrics.record_failed();
        }
        let rate = metrics.loss_rate();
        assert!((rate - 10.0).abs() < 1e-9, "Loss rate was {}", rate);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let metrics = SinkMetrics::new();
        metrics.record_delivered();

        let snapshot = metrics.clone();
        metrics.record_delivered();
        metrics.reset();

        assert_eq!(snapshot.delivered_count(), 1);
        assert_eq!(metrics.delivered_count(), 0);
    }
}
