pub mod auth;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod recipes;
pub mod relations;
pub mod routes;
pub mod shopping;
pub mod users;
pub mod validation;

use foodgram_db::Database;
use tracing::error;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

/// Runs blocking storage work off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
}
