//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; `tracing-subscriber` picks those
//! records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use tourney_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log API request/response
///
/// Requests slower than a second are logged at warn level.
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Slow request"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Request completed"
        );
    }
}

/// Log a state change made by a tournament manager
pub fn log_manager_action(action: &str, user_id: i64, tournament_id: i64) {
    tracing::info!(
        action = action,
        user_id = user_id,
        tournament_id = tournament_id,
        "Manager action"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_api_request() {
        // Just ensure it doesn't panic
        log_api_request("abc", "GET", "/api/v1/tournaments", 200, 45);
        log_api_request("def", "PUT", "/api/v1/matches/1/result", 409, 1500);
    }

    #[test]
    fn test_log_manager_action() {
        log_manager_action("start", 1, 2);
    }
}
