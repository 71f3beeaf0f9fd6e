//! Client metrics collection.
//!
//! Provides standardized metrics for monitoring API traffic:
//! - Request counters by method and status
//! - Latency histograms
//! - Token refresh outcomes and queued requests

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total API requests by method and status.
    pub const REQUESTS_TOTAL: &str = "jobly_client_requests_total";

    /// Request latency in seconds by method.
    pub const LATENCY_SECONDS: &str = "jobly_client_request_latency_seconds";

    /// Token refresh cycles by outcome.
    pub const TOKEN_REFRESH_TOTAL: &str = "jobly_client_token_refresh_total";

    /// Requests that waited on an in-flight refresh.
    pub const REFRESH_QUEUED_TOTAL: &str = "jobly_client_refresh_queued_total";
}

/// Outcome label values for refresh metrics.
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed request. `status` is 0 when no response
/// was received.
pub fn record_request(method: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "method" => method.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record the outcome of a refresh cycle.
pub fn record_refresh(outcome: &'static str) {
    counter!(names::TOKEN_REFRESH_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a request queued behind an in-flight refresh.
pub fn record_refresh_queued() {
    counter!(names::REFRESH_QUEUED_TOTAL).increment(1);
}
