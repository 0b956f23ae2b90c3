//! # Metrics
//!
//! Prometheus counters and histograms recorded through the `metrics` facade, plus a small
//! set of in-process atomic counters summarised on `/health`.
//!
//! | Metric | Labels | Meaning |
//! |--------|--------|---------|
//! | `chainlens_dispatch_requests_total` | operation, outcome | engine calls by result |
//! | `chainlens_dispatch_duration_seconds` | operation | engine call latency |
//! | `chainlens_cache_hits_total` / `_misses_total` | kind | cache-aside lookups |
//! | `chainlens_cache_errors_total` | kind, op | backend failures treated as misses |
//! | `chainlens_upstream_errors_total` | chain, error_type | RPC failures per chain |
//! | `chainlens_fanout_units_total` | chain, outcome | search fan-out unit results |
//! | `chainlens_analytics_requests_total` | chain, success | analytics API calls |
//!
//! Chain labels come from [`ChainId::as_str`](crate::chain::ChainId::as_str), a closed set,
//! so label cardinality is bounded without interning.

use crate::upstream::UpstreamError;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, OnceLock,
};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn try_init_prometheus_recorder(
) -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match try_init_prometheus_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to install primary Prometheus recorder, attempting fallback"
                );

                let recorder = PrometheusBuilder::new().build_recorder();
                tracing::warn!(
                    "Using fallback Prometheus recorder (install error: {e}) - metrics may not be globally visible"
                );
                recorder.handle()
            }
        })
        .clone()
}

/// Outcome label for dispatch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    CacheHit,
    Computed,
    Failed,
}

impl DispatchOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheHit => "cache_hit",
            Self::Computed => "computed",
            Self::Failed => "failed",
        }
    }
}

/// Outcome label for one search fan-out unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Found,
    NotFound,
    Error,
}

impl UnitOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    upstream_errors: AtomicU64,
}

/// Point-in-time copy of the in-process counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub total_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub upstream_errors: u64,
}

pub struct MetricsCollector {
    counters: Counters,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    /// # Errors
    ///
    /// Returns an error if the Prometheus recorder cannot be initialized.
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let prometheus_handle = init_prometheus_recorder();
        Ok(Self { counters: Counters::default(), prometheus_handle })
    }

    /// Record one engine call.
    pub fn record_dispatch(&self, operation: &'static str, outcome: DispatchOutcome, latency_ms: u64) {
        counter!("chainlens_dispatch_requests_total", "operation" => operation, "outcome" => outcome.as_str()).increment(1);
        #[allow(clippy::cast_precision_loss)]
        histogram!("chainlens_dispatch_duration_seconds", "operation" => operation).record(latency_ms as f64 / 1000.0);

        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        if outcome == DispatchOutcome::Failed {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self, kind: &'static str) {
        counter!("chainlens_cache_hits_total", "kind" => kind).increment(1);
        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self, kind: &'static str) {
        counter!("chainlens_cache_misses_total", "kind" => kind).increment(1);
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache backend failure. `op` is `"get"` or `"set"`.
    pub fn record_cache_error(&self, kind: &'static str, op: &'static str) {
        counter!("chainlens_cache_errors_total", "kind" => kind, "op" => op).increment(1);
        self.counters.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self, chain: &'static str, error: &UpstreamError) {
        counter!("chainlens_upstream_errors_total", "chain" => chain, "error_type" => error.kind()).increment(1);
        self.counters.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fanout_unit(&self, chain: &'static str, outcome: UnitOutcome) {
        counter!("chainlens_fanout_units_total", "chain" => chain, "outcome" => outcome.as_str()).increment(1);
    }

    pub fn record_analytics_request(&self, chain: &'static str, success: bool) {
        let success = if success { "true" } else { "false" };
        counter!("chainlens_analytics_requests_total", "chain" => chain, "success" => success).increment(1);
    }

    /// Prometheus text exposition for the `/metrics` route.
    #[must_use]
    pub fn get_prometheus_metrics(&self) -> String {
        self.prometheus_handle.render()
    }

    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let c = &self.counters;
        MetricsSummary {
            total_requests: c.requests.load(Ordering::Relaxed),
            total_failures: c.failures.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            cache_errors: c.cache_errors.load(Ordering::Relaxed),
            upstream_errors: c.upstream_errors.load(Ordering::Relaxed),
        }
    }
}

/// Initialize the default collector.
///
/// # Errors
///
/// Returns an error if the metrics collector cannot be initialized.
pub fn init_metrics() -> Result<Arc<MetricsCollector>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(Arc::new(MetricsCollector::new()?))
}
