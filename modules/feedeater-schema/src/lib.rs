//! Per-module namespace creation and DDL, grounded on
//! `rootsignal-archive::store::ArchiveStore::migrate`'s embedded-migration
//! pattern and on the idempotent batched `CREATE ... IF NOT EXISTS`
//! style of `rootsignal-graph::migrate` (translated here from Cypher into
//! SQL DDL, since the store is relational, not a graph database).

use feedeater_store::vector::ensure_vector_index;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

pub mod core;
pub use core::ensure_core_tables;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Store(#[from] feedeater_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Runs per-module schema bootstrap at every collector boot. Idempotent:
/// safe to call on every process start, even concurrently across modules,
/// because every statement is `IF NOT EXISTS`.
pub struct SchemaManager {
    pool: PgPool,
}

impl SchemaManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the module's namespace schema and runs its DDL statements
    /// in order. `ddl` is typically a module's embedded `.sql` migration
    /// files, concatenated by the caller into individual statements.
    pub async fn ensure_schema(&self, module: &str, ddl: &[&str]) -> Result<()> {
        let schema = format!("mod_{module}");
        sqlx::query(&format!(r#"CREATE SCHEMA IF NOT EXISTS "{schema}""#))
            .execute(&self.pool)
            .await?;

        for statement in ddl {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!(module, "schema ensured");
        Ok(())
    }

    /// Non-destructive evolution of an embedding column's dimension, per
    /// spec §4.4: widens/narrows the `vector(n)` type, then creates or
    /// drops the similarity index depending on whether `n <= 2000`.
    pub async fn ensure_embedding_dimension(
        &self,
        module: &str,
        table: &str,
        column: &str,
        dim: usize,
    ) -> Result<()> {
        let schema = format!("mod_{module}");
        let alter_sql = format!(
            r#"ALTER TABLE "{schema}"."{table}" ALTER COLUMN "{column}" TYPE vector({dim})"#
        );
        sqlx::query(&alter_sql).execute(&self.pool).await?;

        ensure_vector_index(&self.pool, &schema, table, column, dim).await?;

        info!(module, table, column, dim, "embedding dimension ensured");
        Ok(())
    }
}
