//! Process-wide atomic counters for the evidence pipeline.
//!
//! Counters are bumped silently at the call site; [`Metrics::flush`] emits
//! the current values as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free counters.
pub struct Metrics {
    bundles_assembled: AtomicU64,
    bundles_sealed: AtomicU64,
    seal_failures: AtomicU64,
    version_downgrades: AtomicU64,
    redactions_applied: AtomicU64,
    sanitization_degraded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            bundles_assembled: AtomicU64::new(0),
            bundles_sealed: AtomicU64::new(0),
            seal_failures: AtomicU64::new(0),
            version_downgrades: AtomicU64::new(0),
            redactions_applied: AtomicU64::new(0),
            sanitization_degraded: AtomicU64::new(0),
        }
    }

    pub fn inc_bundles_assembled(&self) {
        self.bundles_assembled.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "bundles_assembled", "counter incremented");
    }

    pub fn inc_bundles_sealed(&self) {
        self.bundles_sealed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "bundles_sealed", "counter incremented");
    }

    pub fn inc_seal_failures(&self) {
        self.seal_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "seal_failures", "counter incremented");
    }

    pub fn inc_version_downgrades(&self) {
        self.version_downgrades.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "version_downgrades", "counter incremented");
    }

    /// Add a batch of applied redactions.
    pub fn add_redactions(&self, count: u64) {
        self.redactions_applied.fetch_add(count, Ordering::Relaxed);
        tracing::trace!(metric = "redactions_applied", count, "counter incremented");
    }

    pub fn inc_sanitization_degraded(&self) {
        self.sanitization_degraded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sanitization_degraded", "counter incremented");
    }

    /// Emit all counters as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            bundles_assembled = self.bundles_assembled(),
            bundles_sealed = self.bundles_sealed(),
            seal_failures = self.seal_failures(),
            version_downgrades = self.version_downgrades(),
            redactions_applied = self.redactions_applied(),
            sanitization_degraded = self.sanitization_degraded(),
        );
    }

    pub fn bundles_assembled(&self) -> u64 {
        self.bundles_assembled.load(Ordering::Relaxed)
    }

    pub fn bundles_sealed(&self) -> u64 {
        self.bundles_sealed.load(Ordering::Relaxed)
    }

    pub fn seal_failures(&self) -> u64 {
        self.seal_failures.load(Ordering::Relaxed)
    }

    pub fn version_downgrades(&self) -> u64 {
        self.version_downgrades.load(Ordering::Relaxed)
    }

    pub fn redactions_applied(&self) -> u64 {
        self.redactions_applied.load(Ordering::Relaxed)
    }

    pub fn sanitization_degraded(&self) -> u64 {
        self.sanitization_degraded.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.bundles_assembled.store(0, Ordering::Relaxed);
        self.bundles_sealed.store(0, Ordering::Relaxed);
        self.seal_failures.store(0, Ordering::Relaxed);
        self.version_downgrades.store(0, Ordering::Relaxed);
        self.redactions_applied.store(0, Ordering::Relaxed);
        self.sanitization_degraded.store(0, Ordering::Relaxed);
    }
}
