//! Transactional store adapter
//!
//! Owns pool construction and the serializable-transaction primitive. All
//! writes in the engine run through [`run_serializable`], which guarantees a
//! rollback on every non-success exit (an un-committed `sqlx::Transaction`
//! rolls back on drop, covering cancellation as well).

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgConnection, PgPool};

use crate::config::Config;
use crate::error::EngineError;

/// Build the connection pool
///
/// Idle connections are verified before reuse so the pool survives server
/// disconnects; each new connection gets the configured statement timeout.
pub async fn connect(database_url: &str, config: &Config) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = config.statement_timeout_ms;
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.connection_timeout_ms))
        .idle_timeout(Duration::from_millis(config.idle_timeout_ms))
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let set = format!("SET statement_timeout = {statement_timeout_ms}");
                conn.execute(set.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Run `body` inside one serializable transaction
///
/// Commits on `Ok`, rolls back on `Err`. The body receives the open
/// transaction's connection and must route every statement through it.
pub async fn run_serializable<T, F>(pool: &PgPool, body: F) -> Result<T, EngineError>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, EngineError>>,
{
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after transaction error");
            }
            Err(err)
        }
    }
}

/// Liveness probe
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Drain the pool on graceful shutdown
///
/// New acquires fail immediately once close begins; in-flight transactions
/// get until the timer elapses, after which the server rolls back whatever
/// is left when the connections drop.
pub async fn shutdown(pool: &PgPool, timeout: Duration) {
    tracing::info!("Draining connection pool");
    if tokio::time::timeout(timeout, pool.close()).await.is_err() {
        tracing::warn!(
            timeout_ms = timeout.as_millis() as u64,
            "Shutdown timer elapsed with connections still in flight"
        );
    }
}
