//! Prometheus metrics for launchkit
//!
//! This module provides observability through Prometheus-compatible metrics
//! for search, cache, hook, and launch operations.

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Search metrics
    // ============================================================================

    /// Total number of search requests
    pub static ref SEARCH_REQUESTS: Counter = Counter::with_opts(
        Opts::new(
            "launchkit_search_requests_total",
            "Total number of search requests"
        )
    ).expect("Failed to create SEARCH_REQUESTS counter");

    /// Search request latency in seconds
    pub static ref SEARCH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "launchkit_search_latency_seconds",
            "Search request latency in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0])
    ).expect("Failed to create SEARCH_LATENCY histogram");

    /// Number of search results returned per request
    pub static ref SEARCH_RESULTS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "launchkit_search_results_count",
            "Number of search results returned per request"
        ).buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0])
    ).expect("Failed to create SEARCH_RESULTS histogram");

    /// Background search results dropped because a newer query superseded them
    pub static ref STALE_RESULTS_DROPPED: Counter = Counter::with_opts(
        Opts::new(
            "launchkit_stale_results_dropped_total",
            "Background search results dropped as stale"
        )
    ).expect("Failed to create STALE_RESULTS_DROPPED counter");

    // ============================================================================
    // Cache metrics
    // ============================================================================

    /// Total cache hits
    pub static ref CACHE_HITS: Counter = Counter::with_opts(
        Opts::new("launchkit_cache_hits_total", "Total cache hits")
    ).expect("Failed to create CACHE_HITS counter");

    /// Total cache misses
    pub static ref CACHE_MISSES: Counter = Counter::with_opts(
        Opts::new("launchkit_cache_misses_total", "Total cache misses")
    ).expect("Failed to create CACHE_MISSES counter");

    /// Total cache entries evicted
    pub static ref CACHE_EVICTIONS: Counter = Counter::with_opts(
        Opts::new("launchkit_cache_evictions_total", "Total cache entries evicted")
    ).expect("Failed to create CACHE_EVICTIONS counter");

    /// Current number of cached entries
    pub static ref CACHE_SIZE: Gauge = Gauge::with_opts(
        Opts::new("launchkit_cache_entries", "Current number of cached entries")
    ).expect("Failed to create CACHE_SIZE gauge");

    // ============================================================================
    // Hook metrics
    // ============================================================================

    /// Total hook callback executions
    pub static ref HOOK_EXECUTIONS: Counter = Counter::with_opts(
        Opts::new(
            "launchkit_hook_executions_total",
            "Total hook callback executions"
        )
    ).expect("Failed to create HOOK_EXECUTIONS counter");

    /// Hook callback failures (errors and caught panics)
    pub static ref HOOK_FAILURES: Counter = Counter::with_opts(
        Opts::new(
            "launchkit_hook_failures_total",
            "Hook callback failures including caught panics"
        )
    ).expect("Failed to create HOOK_FAILURES counter");

    /// Hook callback latency in seconds
    pub static ref HOOK_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "launchkit_hook_latency_seconds",
            "Hook callback latency in seconds"
        ).buckets(vec![0.0001, 0.001, 0.01, 0.05, 0.1, 0.5])
    ).expect("Failed to create HOOK_LATENCY histogram");

    // ============================================================================
    // Launch metrics
    // ============================================================================

    /// Total launches recorded by the usage tracker
    pub static ref LAUNCHES_RECORDED: Counter = Counter::with_opts(
        Opts::new(
            "launchkit_launches_recorded_total",
            "Total launches recorded by the usage tracker"
        )
    ).expect("Failed to create LAUNCHES_RECORDED counter");

    /// Number of applications known to the default provider
    pub static ref INDEXED_APPS: Gauge = Gauge::with_opts(
        Opts::new(
            "launchkit_indexed_apps",
            "Number of applications known to the default provider"
        )
    ).expect("Failed to create INDEXED_APPS gauge");
}

/// Register all metrics with the global registry
///
/// This function should be called once at application startup.
/// Panics if metrics registration fails.
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(SEARCH_REQUESTS.clone()))
        .expect("Failed to register SEARCH_REQUESTS");
    REGISTRY
        .register(Box::new(SEARCH_LATENCY.clone()))
        .expect("Failed to register SEARCH_LATENCY");
    REGISTRY
        .register(Box::new(SEARCH_RESULTS.clone()))
        .expect("Failed to register SEARCH_RESULTS");
    REGISTRY
        .register(Box::new(STALE_RESULTS_DROPPED.clone()))
        .expect("Failed to register STALE_RESULTS_DROPPED");
    REGISTRY
        .register(Box::new(CACHE_HITS.clone()))
        .expect("Failed to register CACHE_HITS");
    REGISTRY
        .register(Box::new(CACHE_MISSES.clone()))
        .expect("Failed to register CACHE_MISSES");
    REGISTRY
        .register(Box::new(CACHE_EVICTIONS.clone()))
        .expect("Failed to register CACHE_EVICTIONS");
    REGISTRY
        .register(Box::new(CACHE_SIZE.clone()))
        .expect("Failed to register CACHE_SIZE");
    REGISTRY
        .register(Box::new(HOOK_EXECUTIONS.clone()))
        .expect("Failed to register HOOK_EXECUTIONS");
    REGISTRY
        .register(Box::new(HOOK_FAILURES.clone()))
        .expect("Failed to register HOOK_FAILURES");
    REGISTRY
        .register(Box::new(HOOK_LATENCY.clone()))
        .expect("Failed to register HOOK_LATENCY");
    REGISTRY
        .register(Box::new(LAUNCHES_RECORDED.clone()))
        .expect("Failed to register LAUNCHES_RECORDED");
    REGISTRY
        .register(Box::new(INDEXED_APPS.clone()))
        .expect("Failed to register INDEXED_APPS");
}

/// Gather all metrics and encode them in Prometheus text format
///
/// Returns a string containing all registered metrics in the Prometheus
/// exposition format, suitable for scraping by Prometheus.
///
/// Returns an empty string if encoding fails (which should not happen with valid metrics).
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics contained invalid UTF-8: {}", e);
        String::new()
    })
}

/// Get current metric values in a human-readable format
///
/// This is useful for the CLI stats command.
pub struct MetricSnapshot {
    pub search_requests_total: f64,
    pub search_latency_avg: f64,
    pub search_results_avg: f64,
    pub stale_results_dropped: f64,
    pub cache_hits: f64,
    pub cache_misses: f64,
    pub cache_evictions: f64,
    pub cache_entries: f64,
    pub hook_executions_total: f64,
    pub hook_failures_total: f64,
    pub hook_latency_avg: f64,
    pub launches_recorded: f64,
    pub indexed_apps: f64,
}

impl MetricSnapshot {
    /// Capture the current state of all metrics
    pub fn capture() -> Self {
        Self {
            search_requests_total: SEARCH_REQUESTS.get(),
            search_latency_avg: calculate_histogram_avg(&SEARCH_LATENCY),
            search_results_avg: calculate_histogram_avg(&SEARCH_RESULTS),
            stale_results_dropped: STALE_RESULTS_DROPPED.get(),
            cache_hits: CACHE_HITS.get(),
            cache_misses: CACHE_MISSES.get(),
            cache_evictions: CACHE_EVICTIONS.get(),
            cache_entries: CACHE_SIZE.get(),
            hook_executions_total: HOOK_EXECUTIONS.get(),
            hook_failures_total: HOOK_FAILURES.get(),
            hook_latency_avg: calculate_histogram_avg(&HOOK_LATENCY),
            launches_recorded: LAUNCHES_RECORDED.get(),
            indexed_apps: INDEXED_APPS.get(),
        }
    }

    /// Cache hit ratio over the lifetime of the process, 0.0 when unused.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0.0 {
            return 0.0;
        }
        self.cache_hits / total
    }
}

/// Calculate the average value from a histogram
fn calculate_histogram_avg(histogram: &Histogram) -> f64 {
    let count = histogram.get_sample_count();
    if count == 0 {
        return 0.0;
    }
    histogram.get_sample_sum() / count as f64
}
