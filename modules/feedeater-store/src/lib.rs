//! Relational access layer: a pooled Postgres client, transaction helper,
//! and vector-column support, grounded on how `rootsignal-archive::store`
//! and `rootsignal-events::store` take a `PgPool` and wrap it with a small
//! set of query helpers rather than a full ORM.

pub mod error;
pub mod vector;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use tracing::info;

pub use error::StoreError;
pub use pgvector::Vector as VectorColumn;
pub use vector::ensure_vector_index;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .map_err(StoreError::from)?;
        info!("connected to store");
        Ok(Self { pool })
    }

    /// Exposes the underlying pool for crates (schema manager, settings,
    /// broker) that need `sqlx::query!`-style access directly.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `f` inside one transaction, committing on `Ok` and rolling back
    /// (via drop) on `Err`. The transaction is enclosed start to finish
    /// within this call, matching the `connect()`/`release()` contract in
    /// spec §4.2/§5: callers never hold a client across an await boundary
    /// outside of this closure.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        for<'c> F: FnOnce(
            &'c mut sqlx::Transaction<'_, Postgres>,
        ) -> futures::future::BoxFuture<'c, Result<T>>,
    {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        let value = f(&mut tx).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    // Connection-requiring behavior (transactions, upserts) is covered by
    // `sqlx::test`-backed integration tests in the crates that issue real
    // queries (feedeater-schema, feedeater-broker, feedeater-settings),
    // where the schema under test actually exists.
}
