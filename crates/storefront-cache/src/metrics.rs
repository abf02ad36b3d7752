//! Cache metrics.
//!
//! The cache reports through a [`MetricsSink`] injected at construction.
//! [`RecorderMetrics`] forwards to whatever `metrics` recorder the
//! application installed (e.g. a Prometheus exporter); [`NoopMetrics`]
//! discards everything.

use metrics::counter;

use crate::keys::CacheDomain;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "storefront_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "storefront_cache_misses_total";
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "storefront_cache_invalidations_total";
    pub const CACHE_INVALIDATED_ENTRIES_TOTAL: &str = "storefront_cache_invalidated_entries_total";
}

/// Failure reported by a metrics sink.
#[derive(Debug, thiserror::Error)]
#[error("metrics sink error: {message}")]
pub struct MetricsError {
    pub message: String,
}

impl MetricsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receiver of cache hit/miss/invalidation events.
///
/// Calls are fire-and-forget: the cache logs a returned error (or a panic)
/// and carries on, so implementations must not block.
pub trait MetricsSink: Send + Sync {
    fn record_hit(&self, domain: CacheDomain) -> Result<(), MetricsError>;

    fn record_miss(&self, domain: CacheDomain) -> Result<(), MetricsError>;

    fn record_invalidation(&self, domain: CacheDomain, removed: u64) -> Result<(), MetricsError>;
}

/// Sink emitting counters through the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderMetrics;

impl MetricsSink for RecorderMetrics {
    fn record_hit(&self, domain: CacheDomain) -> Result<(), MetricsError> {
        counter!(names::CACHE_HITS_TOTAL, "domain" => domain.as_str()).increment(1);
        Ok(())
    }

    fn record_miss(&self, domain: CacheDomain) -> Result<(), MetricsError> {
        counter!(names::CACHE_MISSES_TOTAL, "domain" => domain.as_str()).increment(1);
        Ok(())
    }

    fn record_invalidation(&self, domain: CacheDomain, removed: u64) -> Result<(), MetricsError> {
        counter!(names::CACHE_INVALIDATIONS_TOTAL, "domain" => domain.as_str()).increment(1);
        counter!(names::CACHE_INVALIDATED_ENTRIES_TOTAL, "domain" => domain.as_str())
            .increment(removed);
        Ok(())
    }
}

/// Sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_hit(&self, _domain: CacheDomain) -> Result<(), MetricsError> {
        Ok(())
    }

    fn record_miss(&self, _domain: CacheDomain) -> Result<(), MetricsError> {
        Ok(())
    }

    fn record_invalidation(&self, _domain: CacheDomain, _removed: u64) -> Result<(), MetricsError> {
        Ok(())
    }
}
