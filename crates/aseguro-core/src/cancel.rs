//! Cancellation plumbing for calls to external services

use crate::error::{AseguroError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first.
///
/// A cancelled token wins immediately; the in-flight request future is
/// dropped, which aborts the underlying HTTP request.
pub async fn cancellable<T, F>(cancel: &CancellationToken, stage: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(AseguroError::Cancelled(stage.to_string()));
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(stage, "external call cancelled");
            Err(AseguroError::Cancelled(stage.to_string()))
        }
        result = fut => result,
    }
}
