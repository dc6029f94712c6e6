use sqlx::PgPool;
use tracing::warn;

use crate::{Result, StoreError};

/// Cosine-distance `ivfflat` indexes in pgvector only support vectors up to
/// 2000 dimensions. Above that, the schema manager still creates the
/// column but skips the index, per spec §4.4/§8 boundary behavior.
pub const MAX_IVFFLAT_DIMENSIONS: usize = 2000;

/// Creates (or drops, if `dim` now exceeds the limit) the similarity index
/// for an embedding column. Idempotent: safe to call on every boot.
pub async fn ensure_vector_index(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
    dim: usize,
) -> Result<()> {
    let index_name = format!("{table}_{column}_ivfflat_idx");

    if dim > MAX_IVFFLAT_DIMENSIONS {
        warn!(
            schema,
            table, column, dim, "embedding dimension exceeds ivfflat limit, skipping index"
        );
        let drop_sql = format!(r#"DROP INDEX IF EXISTS "{schema}"."{index_name}""#);
        sqlx::query(&drop_sql).execute(pool).await.map_err(StoreError::from)?;
        return Ok(());
    }

    let create_sql = format!(
        r#"CREATE INDEX IF NOT EXISTS "{index_name}" ON "{schema}"."{table}"
           USING ivfflat ("{column}" vector_cosine_ops) WITH (lists = 100)"#
    );
    sqlx::query(&create_sql).execute(pool).await.map_err(StoreError::from)?;
    Ok(())
}
