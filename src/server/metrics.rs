use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all backend metrics
const PREFIX: &str = "kyotei";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Ingestion Metrics
    pub static ref INGEST_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_ingest_total"), "Ingest calls by outcome"),
        &["outcome"]
    ).expect("Failed to create ingest_total metric");

    pub static ref DB_TRANSACTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_db_transaction_duration_seconds"),
            "Duration of committed or rolled back ingest transactions in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).expect("Failed to create db_transaction_duration_seconds metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INGEST_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DB_TRANSACTION_DURATION_SECONDS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Maps a request path to a bounded label value.
///
/// Race ids are collapsed so the label set does not grow with every race.
pub fn path_label(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/api/health" => "/api/health",
        "/health/db" => "/health/db",
        "/dbtest" => "/dbtest",
        "/admin/ingest" => "/admin/ingest",
        p if p.starts_with("/admin/races/") => "/admin/races/{race_id}",
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let path = path_label(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record the outcome of an ingest call (`success`, `forbidden`, `invalid_request`, ...)
pub fn record_ingest(outcome: &str) {
    INGEST_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_db_transaction(duration: Duration) {
    DB_TRANSACTION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
