//! Transaction scoping, query deadlines and driver error classification.
//!
//! Shared by both backends; everything here is generic over `sqlx::Database`.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use social_types::StoreError;
use sqlx::{Database, Pool};

/// Upper bound for a single statement, independent of the caller's deadline.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `step` inside one transaction on a single pooled connection.
///
/// Commits only if `step` succeeds. On failure the transaction is rolled back
/// and the step's error is returned unchanged. If the surrounding future is
/// dropped (client gone, upstream timeout) the `sqlx::Transaction` guard rolls
/// back and returns the connection to the pool on drop.
pub(crate) async fn with_tx<DB, T, F>(pool: &Pool<DB>, step: F) -> Result<T, StoreError>
where
    DB: Database,
    T: Send,
    F: for<'c> FnOnce(&'c mut DB::Connection) -> BoxFuture<'c, Result<T, StoreError>> + Send,
{
    let mut tx = timed(pool.begin())
        .await?
        .map_err(|e| StoreError::Transaction(e.to_string()))?;

    match step(&mut *tx).await {
        Ok(value) => {
            timed(tx.commit())
                .await?
                .map_err(|e| StoreError::Transaction(e.to_string()))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Bounds `fut` by [`QUERY_TIMEOUT`].
///
/// The outer error is the deadline; the inner result is the driver's own, left
/// unclassified so callers can inspect constraint violations.
pub(crate) async fn timed<T, F>(fut: F) -> Result<Result<T, sqlx::Error>, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(QUERY_TIMEOUT, fut)
        .await
        .map_err(|_| StoreError::Timeout)
}

/// Generic classification of driver errors.
///
/// Backend-specific duplicate-user detection happens before this fallback.
pub(crate) fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict("resource already exists".into())
        }
        _ => StoreError::Database(err.to_string()),
    }
}
