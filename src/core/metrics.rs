//! Pipeline metrics for observability
//!
//! Counters for the delivery pipeline and the compression worker. All
//! counters use relaxed atomics; they are statistics, not synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`Service`](super::service::Service)
///
/// # Example
///
/// ```
/// use tidelog::ServiceMetrics;
///
/// let metrics = ServiceMetrics::new();
/// metrics.record_submitted();
/// metrics.record_dispatched();
///
/// assert_eq!(metrics.submitted(), 1);
/// assert_eq!(metrics.dispatched(), 1);
/// ```
#[derive(Debug)]
pub struct ServiceMetrics {
    /// Messages linked into the delivery queue
    submitted: AtomicU64,

    /// Messages delivered to a live logger by the writer
    dispatched: AtomicU64,

    /// Messages thrown away because the pipeline was already closed
    discarded: AtomicU64,

    /// Messages whose logger was dropped before dispatch
    orphaned: AtomicU64,

    /// Rotated files successfully compressed
    compressed: AtomicU64,

    /// Rotated files left uncompressed after a codec or I/O failure
    compression_failures: AtomicU64,

    /// Compressed artifacts deleted by retention sweeps
    retention_removed: AtomicU64,
}

impl ServiceMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            orphaned: AtomicU64::new(0),
            compressed: AtomicU64::new(0),
            compression_failures: AtomicU64::new(0),
            retention_removed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn orphaned(&self) -> u64 {
        self.orphaned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn compressed(&self) -> u64 {
        self.compressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn compression_failures(&self) -> u64 {
        self.compression_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retention_removed(&self) -> u64 {
        self.retention_removed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded(&self) -> u64 {
        self.discarded.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_orphaned(&self) -> u64 {
        self.orphaned.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_compressed(&self) -> u64 {
        self.compressed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_compression_failure(&self) -> u64 {
        self.compression_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_retention_removed(&self, count: u64) -> u64 {
        self.retention_removed.fetch_add(count, Ordering::Relaxed)
    }

    /// Messages accepted but not yet delivered or orphaned
    pub fn in_flight(&self) -> u64 {
        self.submitted()
            .saturating_sub(self.dispatched() + self.orphaned())
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.dispatched.store(0, Ordering::Relaxed);
        self.discarded.store(0, Ordering::Relaxed);
        self.orphaned.store(0, Ordering::Relaxed);
        self.compressed.store(0, Ordering::Relaxed);
        self.compression_failures.store(0, Ordering::Relaxed);
        self.retention_removed.store(0, Ordering::Relaxed);
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ServiceMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            submitted: AtomicU64::new(self.submitted()),
            dispatched: AtomicU64::new(self.dispatched()),
            discarded: AtomicU64::new(self.discarded()),
            orphaned: AtomicU64::new(self.orphaned()),
            compressed: AtomicU64::new(self.compressed()),
            compression_failures: AtomicU64::new(self.compression_failures()),
            retention_removed: AtomicU64::new(self.retention_removed()),
        }
    }
}
