//! Metrics collection for observability

use prometheus::{
    CounterVec, HistogramVec, Opts, Registry,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Verify API metrics
    pub verify_requests: CounterVec,
    pub verify_request_duration: HistogramVec,
    pub verdicts: CounterVec,

    // Pipeline metrics
    pub provider_fetches: CounterVec,
    pub provider_fetch_duration: HistogramVec,
    pub ai_fallback: CounterVec,
    pub ai_request_duration: HistogramVec,
    pub similarity_candidates: CounterVec,
    pub embedding_cache: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let verify_requests = register_counter_vec_with_registry!(
            Opts::new("verify_requests_total", "Total claim verification requests"),
            &["status"],
            registry
        )?;

        let verify_request_duration = register_histogram_vec_with_registry!(
            "verify_request_duration_seconds",
            "Claim verification request duration in seconds",
            &["input"],
            registry
        )?;

        let verdicts = register_counter_vec_with_registry!(
            Opts::new("verdicts_total", "Final verdicts by label and deciding path"),
            &["verdict", "source"],
            registry
        )?;

        let provider_fetches = register_counter_vec_with_registry!(
            Opts::new("provider_fetches_total", "Provider fetches by outcome"),
            &["provider", "status"],
            registry
        )?;

        let provider_fetch_duration = register_histogram_vec_with_registry!(
            "provider_fetch_duration_seconds",
            "Provider fetch duration in seconds",
            &["provider"],
            registry
        )?;

        let ai_fallback = register_counter_vec_with_registry!(
            Opts::new("ai_fallback_total", "AI classify/explain calls by outcome"),
            &["operation", "outcome"],
            registry
        )?;

        let ai_request_duration = register_histogram_vec_with_registry!(
            "ai_request_duration_seconds",
            "Generative AI request duration in seconds",
            &["operation"],
            registry
        )?;

        let similarity_candidates = register_counter_vec_with_registry!(
            Opts::new("similarity_candidates_total", "Candidates kept or dropped by the similarity filter"),
            &["decision"],
            registry
        )?;

        let embedding_cache = register_counter_vec_with_registry!(
            Opts::new("embedding_cache_total", "Embedding cache lookups"),
            &["result"],
            registry
        )?;

        Ok(Self {
            registry,
            verify_requests,
            verify_request_duration,
            verdicts,
            provider_fetches,
            provider_fetch_duration,
            ai_fallback,
            ai_request_duration,
            similarity_candidates,
            embedding_cache,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a verify request
    pub fn record_verify(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.verify_requests.with_label_values(&[status]).inc();
    }

    /// Record the verdict that was returned
    pub fn record_verdict(&self, verdict: &str, source: &str) {
        self.verdicts.with_label_values(&[verdict, source]).inc();
    }

    /// Record a provider fetch outcome
    pub fn record_provider_fetch(&self, provider: &str, status: &str) {
        self.provider_fetches.with_label_values(&[provider, status]).inc();
    }

    /// Record an AI call outcome (`success`, `timeout`, `quota`, ...)
    pub fn record_ai(&self, operation: &str, outcome: &str) {
        self.ai_fallback.with_label_values(&[operation, outcome]).inc();
    }

    /// Record similarity filter decisions
    pub fn record_similarity(&self, kept: usize, dropped: usize) {
        self.similarity_candidates.with_label_values(&["kept"]).inc_by(kept as f64);
        self.similarity_candidates.with_label_values(&["dropped"]).inc_by(dropped as f64);
    }

    /// Record an embedding cache lookup
    pub fn record_embedding_cache(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.embedding_cache.with_label_values(&[result]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Helper macro to time operations
#[macro_export]
macro_rules! time_operation {
    ($histogram:expr, $label:expr, $operation:expr) => {{
        let timer = $histogram.with_label_values(&[$label]).start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}
