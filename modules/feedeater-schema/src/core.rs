//! Bootstrap for the shared, non-module-scoped tables (spec §6's
//! "Persisted state"): `settings`, `jobs`, `job_instances`, `bus_messages`,
//! `bus_contexts`. These live in the default `public` schema, unlike
//! per-module tables which live under `mod_<name>`.

use sqlx::PgPool;
use tracing::info;

use crate::Result;

const CORE_DDL: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS settings (
        module TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT,
        is_secret BOOLEAN NOT NULL DEFAULT FALSE,
        PRIMARY KEY (module, key)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS jobs (
        module TEXT NOT NULL,
        name TEXT NOT NULL,
        queue TEXT NOT NULL,
        schedule TEXT,
        trigger_class TEXT,
        last_run_at TIMESTAMPTZ,
        last_success_at TIMESTAMPTZ,
        last_error_at TIMESTAMPTZ,
        last_error TEXT,
        last_status TEXT NOT NULL DEFAULT 'idle',
        last_metrics JSONB,
        last_run_created_at TIMESTAMPTZ,
        PRIMARY KEY (module, name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS job_instances (
        id UUID PRIMARY KEY,
        module TEXT NOT NULL,
        job TEXT NOT NULL,
        queue TEXT NOT NULL,
        enqueued_at TIMESTAMPTZ NOT NULL,
        started_at TIMESTAMPTZ,
        ended_at TIMESTAMPTZ,
        status TEXT NOT NULL DEFAULT 'running',
        error TEXT,
        metrics JSONB
    )"#,
    r#"CREATE INDEX IF NOT EXISTS job_instances_module_job_idx ON job_instances (module, job, enqueued_at DESC)"#,
    r#"CREATE TABLE IF NOT EXISTS bus_messages (
        subject TEXT NOT NULL,
        received_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        message_id UUID,
        context_summary_short TEXT,
        data JSONB NOT NULL
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS bus_messages_message_id_idx ON bus_messages (message_id) WHERE message_id IS NOT NULL"#,
    r#"CREATE INDEX IF NOT EXISTS bus_messages_received_at_idx ON bus_messages (received_at DESC)"#,
    r#"CREATE TABLE IF NOT EXISTS bus_contexts (
        owner_module TEXT NOT NULL,
        source_key TEXT NOT NULL,
        summary_short TEXT NOT NULL,
        summary_long TEXT NOT NULL,
        key_points JSONB NOT NULL DEFAULT '[]',
        embedding vector,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (owner_module, source_key)
    )"#,
];

/// Idempotent, safe to run at every process start (mirrors
/// `SchemaManager::ensure_schema`'s `IF NOT EXISTS` idiom).
pub async fn ensure_core_tables(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(pool).await?;

    for statement in CORE_DDL {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("core tables ensured");
    Ok(())
}
