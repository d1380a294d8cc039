// Prometheus metrics
//
// Counters and histograms for the request pipeline and the eviction sweep:
// - Requests by HTTP status
// - Cache lookups (hit, miss, short-circuit) and stores
// - Transform duration by output format
// - Evicted files and bytes, failed sweeps
// - Coalesced followers

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Process-wide metrics
pub struct Metrics {
    /// Requests answered, by status code
    pub requests: IntCounterVec,

    /// Cache lookups by outcome (hit, miss, short_circuit)
    pub cache_lookups: IntCounterVec,

    /// Cache stores by outcome (written, already_present)
    pub cache_stores: IntCounterVec,

    /// Decode-to-encode duration in seconds, by output format
    pub transform_duration: HistogramVec,

    /// Artifacts removed by eviction sweeps
    pub evicted_files: IntCounter,

    /// Bytes freed by eviction sweeps
    pub evicted_bytes: IntCounter,

    /// Sweeps skipped because the cache directory could not be read
    pub sweep_failures: IntCounter,

    /// Requests that waited on an identical in-flight request
    pub coalesced_followers: IntCounter,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<Metrics> = OnceLock::new();

impl Metrics {
    /// Initialize and return the global metrics instance
    ///
    /// Registration happens on first use; later calls return the same
    /// instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "kasasagi_requests_total",
                "Total number of requests by HTTP status",
                &["status"]
            )
            .expect("Failed to register requests_total metric");

            let cache_lookups = register_int_counter_vec!(
                "kasasagi_cache_lookups_total",
                "Total number of cache lookups by outcome",
                &["outcome"] // hit, miss, short_circuit
            )
            .expect("Failed to register cache_lookups_total metric");

            let cache_stores = register_int_counter_vec!(
                "kasasagi_cache_stores_total",
                "Total number of cache stores by outcome",
                &["outcome"] // written, already_present
            )
            .expect("Failed to register cache_stores_total metric");

            let transform_duration = register_histogram_vec!(
                "kasasagi_transform_duration_seconds",
                "Duration of image transforms in seconds",
                &["format"],
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register transform_duration_seconds metric");

            let evicted_files = register_int_counter!(
                "kasasagi_cache_evicted_files_total",
                "Total number of cache artifacts removed by eviction"
            )
            .expect("Failed to register cache_evicted_files_total metric");

            let evicted_bytes = register_int_counter!(
                "kasasagi_cache_evicted_bytes_total",
                "Total bytes freed by cache eviction"
            )
            .expect("Failed to register cache_evicted_bytes_total metric");

            let sweep_failures = register_int_counter!(
                "kasasagi_cache_sweep_failures_total",
                "Total number of skipped eviction sweeps"
            )
            .expect("Failed to register cache_sweep_failures_total metric");

            let coalesced_followers = register_int_counter!(
                "kasasagi_coalesced_followers_total",
                "Total number of requests coalesced onto an in-flight transform"
            )
            .expect("Failed to register coalesced_followers_total metric");

            Metrics {
                requests,
                cache_lookups,
                cache_stores,
                transform_duration,
                evicted_files,
                evicted_bytes,
                sweep_failures,
                coalesced_followers,
            }
        })
    }

    pub fn record_request(&self, status: u16) {
        self.requests
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_lookups.with_label_values(&["hit"]).inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_lookups.with_label_values(&["miss"]).inc();
    }

    pub fn record_short_circuit(&self) {
        self.cache_lookups.with_label_values(&["short_circuit"]).inc();
    }

    pub fn record_store(&self, written: bool) {
        let outcome = if written { "written" } else { "already_present" };
        self.cache_stores.with_label_values(&[outcome]).inc();
    }

    pub fn record_transform(&self, format: &str, elapsed: Duration) {
        self.transform_duration
            .with_label_values(&[format])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_sweep(&self, removed: u64, bytes: u64) {
        self.evicted_files.inc_by(removed);
        self.evicted_bytes.inc_by(bytes);
    }

    pub fn record_sweep_failure(&self) {
        self.sweep_failures.inc();
    }

    pub fn record_coalesced_follower(&self) {
        self.coalesced_followers.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_returns_same_instance() {
        let a = Metrics::global() as *const Metrics;
        let b = Metrics::global() as *const Metrics;
        assert_eq!(a, b);
    }

    #[test]
    fn test_counters_increment() {
        let metrics = Metrics::global();
        let before = metrics.cache_lookups.with_label_values(&["hit"]).get();
        metrics.record_cache_hit();
        assert!(metrics.cache_lookups.with_label_values(&["hit"]).get() > before);

        let before = metrics.evicted_bytes.get();
        metrics.record_sweep(2, 2048);
        assert!(metrics.evicted_bytes.get() >= before + 2048);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let metrics = Metrics::global();
        metrics.record_request(200);
        metrics.record_transform("jpeg", Duration::from_millis(12));

        let text = metrics.render().unwrap();
        assert!(text.contains("kasasagi_requests_total"));
        assert!(text.contains("kasasagi_transform_duration_seconds"));
    }
}
