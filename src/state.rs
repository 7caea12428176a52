//! # Application State Management
//!
//! Shared state that every HTTP request handler can reach. Each incoming
//! request is otherwise independent: the only cross-request resources are
//! this state (read-mostly) and the uploads directory, which needs no
//! locking because filenames are generated fresh per request.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: Multiple ownership (many HTTP handlers hold a reference)
//! - **RwLock**: Multiple readers OR one writer at a time
//! - **T**: The actual data being protected
//!
//! The pipeline itself holds no mutable state, so it sits behind a plain
//! `Arc` without a lock.

use crate::config::AppConfig;
use crate::pipeline::AnalysisPipeline;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration, loaded once at startup
    pub config: Arc<RwLock<AppConfig>>,

    /// Request/error counters and per-endpoint statistics
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// The orchestration pipeline (store + both outbound clients)
    pub pipeline: Arc<AnalysisPipeline>,

    /// When the server started (Instant is Copy, no lock needed)
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Pipeline stage-one or stage-two calls currently in flight
    pub active_pipelines: u32,

    /// Detailed metrics keyed by endpoint (e.g. "POST /transcribe")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Per-endpoint request statistics.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let pipeline = Arc::new(AnalysisPipeline::new(&config));
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            pipeline,
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration. Cloning releases the read
    /// lock immediately; AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record one finished request for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Track a pipeline call entering (stage one or stage two).
    pub fn increment_active_pipelines(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_pipelines += 1;
    }

    /// Track a pipeline call leaving. Guarded against underflow.
    pub fn decrement_active_pipelines(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_pipelines > 0 {
            metrics.active_pipelines -= 1;
        }
    }

    /// Consistent copy of the metrics for the /metrics endpoint. Cloning
    /// avoids holding the lock while the HTTP response is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_pipelines: metrics.active_pipelines,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate in [0.0, 1.0].
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(AppConfig::default())
    }

    #[test]
    fn test_request_and_error_counters() {
        let state = state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = state();
        state.record_endpoint_request("POST /transcribe", 120, false);
        state.record_endpoint_request("POST /transcribe", 80, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /transcribe"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert!((metric.average_duration_ms() - 100.0).abs() < f64::EPSILON);
        assert!((metric.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_active_pipelines_never_underflow() {
        let state = state();
        state.decrement_active_pipelines();
        state.increment_active_pipelines();
        state.decrement_active_pipelines();
        state.decrement_active_pipelines();

        assert_eq!(state.get_metrics_snapshot().active_pipelines, 0);
    }
}
