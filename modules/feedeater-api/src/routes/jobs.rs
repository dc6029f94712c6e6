use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use feedeater_common::model::{JobRecord, JobStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;

#[derive(sqlx::FromRow)]
struct JobRow {
    module: String,
    name: String,
    queue: String,
    schedule: Option<String>,
    trigger_class: Option<String>,
    last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    last_success_at: Option<chrono::DateTime<chrono::Utc>>,
    last_error_at: Option<chrono::DateTime<chrono::Utc>>,
    last_error: Option<String>,
    last_status: String,
    last_metrics: Option<Value>,
    last_run_created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        JobRecord {
            module: row.module,
            name: row.name,
            queue: row.queue,
            schedule: row.schedule,
            trigger_class: row.trigger_class,
            last_run_at: row.last_run_at,
            last_success_at: row.last_success_at,
            last_error_at: row.last_error_at,
            last_error: row.last_error,
            last_status: JobStatus::from_str(&row.last_status).unwrap_or(JobStatus::Idle),
            last_metrics: row.last_metrics,
            last_run_created_at: row.last_run_created_at,
        }
    }
}

/// `GET /api/jobs/status` — per-job status table.
pub async fn job_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"SELECT module, name, queue, schedule, trigger_class, last_run_at, last_success_at,
                  last_error_at, last_error, last_status, last_metrics, last_run_created_at
           FROM jobs ORDER BY module, name"#,
    )
    .fetch_all(&state.pool)
    .await;

    match rows {
        Ok(rows) => (StatusCode::OK, Json(rows.into_iter().map(JobRecord::from).collect::<Vec<_>>())),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::new())),
    }
}

#[derive(Debug, Deserialize)]
pub struct RunJobBody {
    pub module: String,
    pub job: String,
}

#[derive(Debug, Serialize)]
pub struct RunJobResponse {
    #[serde(rename = "jobId")]
    pub job_id: uuid::Uuid,
}

/// `POST /api/jobs/run` — manual enqueue (spec §8 scenario S3).
pub async fn run_job(State(state): State<Arc<AppState>>, Json(body): Json<RunJobBody>) -> impl IntoResponse {
    let Some(queue) = state.queue_for(&body.module, &body.job) else {
        return (StatusCode::NOT_FOUND, Json(None));
    };

    let job_id = queue.enqueue_manual(&body.module, &body.job);
    (StatusCode::OK, Json(Some(RunJobResponse { job_id })))
}
