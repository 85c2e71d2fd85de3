//! Timeout helpers for engine operations.
//!
//! Bounds storage work so a stuck lock or connection cannot hang a request.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{EngineError, EngineResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for long-running operations such as migrations (30 seconds)
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute an engine operation with a timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `EngineResult<T>` - The operation's result, or `EngineError::Timeout`
///
/// Dropping the future on timeout drops any open transaction inside it, which
/// rolls that transaction back.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(duration)),
    }
}

/// Execute a query with the default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_elapsed_maps_to_timeout_error() {
        let result: EngineResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(EngineError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: EngineResult<()> =
            with_default_timeout(async { Err(EngineError::NotManager) }).await;
        assert!(matches!(result, Err(EngineError::NotManager)));
    }
}
