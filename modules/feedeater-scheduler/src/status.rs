use async_trait::async_trait;
use chrono::Utc;
use feedeater_common::model::JobStatus;
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Sink for job lifecycle transitions, so the dispatch logic in
/// `JobQueue` can be exercised in tests without a live Postgres instance.
/// `JobStatusStore` is the production implementation.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn mark_running(&self, instance_id: Uuid, module: &str, job: &str, queue: &str);
    async fn mark_finished(&self, instance_id: Uuid, module: &str, job: &str, result: Result<Value, String>);
}

/// Persists job lifecycle transitions (spec §3, §4.8): `idle -> running ->
/// {success, error}` on the `jobs` row, plus one `job_instances` row per
/// execution for status reporting. Write failures are logged and
/// swallowed — a lost status update must never abort the job itself.
pub struct JobStatusStore {
    pool: PgPool,
}

impl JobStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusSink for JobStatusStore {
    async fn mark_running(&self, instance_id: Uuid, module: &str, job: &str, queue: &str) {
        let now = Utc::now();

        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO job_instances (id, module, job, queue, enqueued_at, started_at, status)
            VALUES ($1, $2, $3, $4, $5, $5, 'running')
            "#,
        )
        .bind(instance_id)
        .bind(module)
        .bind(job)
        .bind(queue)
        .bind(now)
        .execute(&self.pool)
        .await
        {
            warn!(module, job, error = %e, "failed to record job instance start");
        }

        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO jobs (module, name, queue, last_status, last_run_at)
            VALUES ($1, $2, $3, 'running', $4)
            ON CONFLICT (module, name) DO UPDATE SET last_status = 'running', last_run_at = $4
            "#,
        )
        .bind(module)
        .bind(job)
        .bind(queue)
        .bind(now)
        .execute(&self.pool)
        .await
        {
            warn!(module, job, error = %e, "failed to update job status to running");
        }
    }

    async fn mark_finished(&self, instance_id: Uuid, module: &str, job: &str, result: Result<Value, String>) {
        let now = Utc::now();
        let (status, error, metrics) = match &result {
            Ok(metrics) => (JobStatus::Success, None, Some(metrics.clone())),
            Err(e) => (JobStatus::Error, Some(e.clone()), None),
        };

        if let Err(e) = sqlx::query(
            r#"
            UPDATE job_instances
            SET ended_at = $1, status = $2, error = $3, metrics = $4
            WHERE id = $5
            "#,
        )
        .bind(now)
        .bind(status.to_string())
        .bind(&error)
        .bind(&metrics)
        .bind(instance_id)
        .execute(&self.pool)
        .await
        {
            warn!(module, job, error = %e, "failed to record job instance completion");
        }

        let update = match status {
            JobStatus::Success => sqlx::query(
                r#"
                UPDATE jobs SET last_status = 'success', last_success_at = $1, last_metrics = $2
                WHERE module = $3 AND name = $4
                "#,
            )
            .bind(now)
            .bind(&metrics)
            .bind(module)
            .bind(job),
            _ => sqlx::query(
                r#"
                UPDATE jobs SET last_status = 'error', last_error_at = $1, last_error = $2
                WHERE module = $3 AND name = $4
                "#,
            )
            .bind(now)
            .bind(&error)
            .bind(module)
            .bind(job),
        };

        if let Err(e) = update.execute(&self.pool).await {
            warn!(module, job, error = %e, "failed to update job status on completion");
        }
    }
}
