//! Prometheus metrics for monitoring the tournament server.
//!
//! Metrics are exposed in Prometheus text format on the address given by
//! `METRICS_BIND`. Without an installed exporter the recording calls are no-ops.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and durations
//! - **Tournament Metrics**: Tournaments started, results reported, rounds generated
//! - **Betting Metrics**: Predictions placed, points staked and paid out

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
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
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Increment tournaments started counter.
pub fn tournaments_started_total(format: &str) {
    metrics::counter!("tournaments_started_total",
        "format" => format.to_string()
    )
    .increment(1);
}

/// Increment results reported counter.
pub fn results_reported_total(stage: &str) {
    metrics::counter!("results_reported_total",
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Increment generated bracket rounds counter.
pub fn rounds_generated_total() {
    metrics::counter!("rounds_generated_total").increment(1);
}

// ============================================================================
// Betting Metrics
// ============================================================================

/// Record a placed prediction and its stake.
pub fn prediction_placed(amount: i64) {
    metrics::counter!("predictions_placed_total").increment(1);
    metrics::histogram!("prediction_stake_points").record(amount as f64);
}

/// Record points returned to bettors by one settlement.
pub fn points_paid_out(paid: i64, house_take: i64) {
    metrics::counter!("points_paid_out_total").increment(paid.max(0) as u64);
    metrics::counter!("points_house_take_total").increment(house_take.max(0) as u64);
}
