//! Metrics for observability
//!
//! `LoggerMetrics` tracks the dispatcher and its queues; `SinkMetrics`
//! tracks what a buffered sink actually persisted.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use fanout_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_dispatched();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_dispatched(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Number of records dropped because a sink queue was full or closed
    dropped_count: AtomicU64,

    /// Total number of entries handed to the sinks
    total_dispatched: AtomicU64,

    /// Number of sink invocations that panicked
    sink_failures: AtomicU64,

    /// Number of times a sink queue became full
    queue_full_events: AtomicU64,

    /// Number of times blocking occurred while waiting for queue space
    block_events: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_dispatched: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_dispatched(&self) -> u64 {
        self.total_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    /// Record a dropped record, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.total_dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been dispatched.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_dispatched() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_dispatched.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dropped_count: AtomicU64::new(self.dropped_count()),
            total_dispatched: AtomicU64::new(self.total_dispatched()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
        }
    }
}

/// Counters kept by buffered sinks
#[derive(Debug, Default)]
pub struct SinkMetrics {
    flushes: AtomicU64,
    records_written: AtomicU64,
    records_lost: AtomicU64,
    bytes_written: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            flushes: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            records_lost: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    /// Number of non-empty flushes that reached the destination
    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Records discarded by failed writes or rejected after disposal
    #[inline]
    pub fn records_lost(&self) -> u64 {
        self.records_lost.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn record_write(&self, records: usize, bytes: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.records_written.fetch_add(records as u64, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_lost(&self, records: usize) {
        self.records_lost.fetch_add(records as u64, Ordering::Relaxed);
    }
}
