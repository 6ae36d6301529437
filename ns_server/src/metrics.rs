//! Prometheus metrics for monitoring server health and report intake.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! when `METRICS_BIND` is set. Without an installed exporter every recorder
//! call is a no-op, so handlers record unconditionally.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Report Metrics**: Reports submitted, evidence images stored
//! - **Auth Metrics**: Login attempts, rejected tokens
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ns_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/auth/login", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Report Metrics
// ============================================================================

/// Increment reports submitted counter.
pub fn reports_submitted_total(anonymous: bool) {
    metrics::counter!("reports_submitted_total",
        "anonymous" => anonymous.to_string()
    )
    .increment(1);
}

/// Count evidence images kept with a stored report.
pub fn evidence_images_stored(count: usize) {
    metrics::counter!("evidence_images_stored_total").increment(count as u64);
}

/// Increment rejected submissions counter.
pub fn reports_rejected_total(reason: &'static str) {
    metrics::counter!("reports_rejected_total",
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment rejected bearer token counter.
pub fn rejected_tokens_total() {
    metrics::counter!("rejected_tokens_total").increment(1);
}
