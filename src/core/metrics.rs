//! Router metrics for observability
//!
//! Counters for monitoring routing health: records routed, per-sink write
//! failures, flush failures and the number of bytes handed to sinks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for router observability
///
/// # Example
///
/// ```
/// use rust_tee_logger::RouterMetrics;
///
/// let metrics = RouterMetrics::new();
///
/// metrics.record_routed();
/// metrics.record_sink_write(128);
/// metrics.record_sink_failure();
///
/// assert_eq!(metrics.records_routed(), 1);
/// assert_eq!(metrics.bytes_written(), 128);
/// assert_eq!(metrics.sink_failures(), 1);
/// ```
#[derive(Debug)]
pub struct RouterMetrics {
    /// Records accepted by at least one route
    records_routed: AtomicU64,

    /// Successful sink writes (one record can produce several)
    sink_writes: AtomicU64,

    /// Sink writes that returned an error or panicked
    sink_failures: AtomicU64,

    /// Failed sink flushes
    flush_failures: AtomicU64,

    /// Bytes accepted by sinks
    bytes_written: AtomicU64,
}

impl RouterMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_routed: AtomicU64::new(0),
            sink_writes: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_routed(&self) -> u64 {
        self.records_routed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_writes(&self) -> u64 {
        self.sink_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_routed(&self) -> u64 {
        self.records_routed.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a successful sink write of `bytes` bytes
    #[inline]
    pub fn record_sink_write(&self, bytes: usize) {
        self.sink_writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush_failure(&self) -> u64 {
        self.flush_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed sink writes as a percentage (0.0 - 100.0) of all attempts
    pub fn failure_rate(&self) -> f64 {
        let failed = self.sink_failures() as f64;
        let total = self.sink_writes() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_routed.store(0, Ordering::Relaxed);
        self.sink_writes.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
        self.flush_failures.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RouterMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_routed: AtomicU64::new(self.records_routed()),
            sink_writes: AtomicU64::new(self.sink_writes()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            flush_failures: AtomicU64::new(self.flush_failures()),
            bytes_written: AtomicU64::new(self.bytes_written()),
        }
    }
}
