//! Request counters exposed through `GET /health`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    conversions_completed: AtomicU64,
    conversions_failed: AtomicU64,
    compression_fallbacks: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversion_completed(&self) {
        self.conversions_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "conversions_completed", "Metric incremented");
    }

    pub fn conversion_failed(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "conversions_failed", "Metric incremented");
    }

    /// A compression request was served without Ghostscript
    pub fn compression_fallback(&self) {
        self.compression_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "compression_fallbacks", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            conversions_completed: self.conversions_completed.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            compression_fallbacks: self.compression_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub conversions_completed: u64,
    pub conversions_failed: u64,
    pub compression_fallbacks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let metrics = Metrics::new();
        metrics.conversion_completed();
        metrics.conversion_completed();
        metrics.conversion_failed();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                conversions_completed: 2,
                conversions_failed: 1,
                compression_fallbacks: 0,
            }
        );
    }
}
