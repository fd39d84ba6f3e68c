pub mod mods;

use crate::models::error::SError;

/// Runs blocking manager work off the async runtime.
pub(crate) async fn blocking<F, R>(f: F) -> Result<R, SError>
where
    F: FnOnce() -> Result<R, SError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SError::AsyncRuntimeError(e.to_string()))? // Unwraps JoinError
}
