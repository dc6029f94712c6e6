use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use feedeater_common::model::BusHistoryRow;
use serde::Deserialize;
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "sinceMinutes")]
    pub since_minutes: Option<i64>,
    pub limit: Option<i64>,
    pub module: Option<String>,
    pub stream: Option<String>,
    pub q: Option<String>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    subject: String,
    received_at: DateTime<Utc>,
    context_summary_short: Option<String>,
    data: Value,
}

impl From<HistoryRow> for BusHistoryRow {
    fn from(row: HistoryRow) -> Self {
        BusHistoryRow {
            subject: row.subject,
            received_at: row.received_at,
            context_summary_short: row.context_summary_short,
            data: row.data,
        }
    }
}

/// `GET /api/bus/history?sinceMinutes&limit&module?&stream?&q?`.
pub async fn history(State(state): State<Arc<AppState>>, Query(params): Query<HistoryQuery>) -> impl IntoResponse {
    let since_minutes = params.since_minutes.unwrap_or(60).max(0);
    let limit = params.limit.unwrap_or(200).clamp(1, state.history_cap);

    let mut qb = sqlx::QueryBuilder::new(
        "SELECT subject, received_at, context_summary_short, data FROM bus_messages WHERE received_at >= now() - make_interval(mins => ",
    );
    qb.push_bind(since_minutes as i32).push(")");

    if let Some(module) = &params.module {
        qb.push(" AND subject LIKE ").push_bind(format!("{}.{module}.%", state.event_root));
    }
    if let Some(stream) = &params.stream {
        qb.push(" AND data->'message'->'source'->>'stream' = ").push_bind(stream.clone());
    }
    if let Some(q) = &params.q {
        qb.push(" AND data->>'message' ILIKE ").push_bind(format!("%{q}%"));
    }

    qb.push(" ORDER BY received_at DESC LIMIT ").push_bind(limit);

    let rows = qb.build_query_as::<HistoryRow>().fetch_all(&state.pool).await;

    match rows {
        Ok(rows) => Json(rows.into_iter().map(BusHistoryRow::from).collect::<Vec<_>>()).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "bus history query failed");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

const LIVE_STREAM_HISTORY_MINUTES: i64 = 60;

/// `GET /api/bus/stream` — SSE bridge (spec §4.10, scenario S6): emits a
/// deduped history slice first, then switches to live broker messages,
/// dropping anything already seen in history.
pub async fn stream_messages(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let pattern = format!("{}.*.messageCreated", state.event_root);
    let live = state.broker.subscribe(&pattern);
    let pool = state.pool.clone();
    let history_cap = state.history_cap;

    let event_stream = async_stream::stream! {
        let mut seen: HashSet<String> = HashSet::new();

        let rows: Vec<HistoryRow> = sqlx::query_as::<_, HistoryRow>(
            "SELECT subject, received_at, context_summary_short, data FROM bus_messages \
             WHERE received_at >= now() - make_interval(mins => $1) ORDER BY received_at ASC LIMIT $2",
        )
        .bind(LIVE_STREAM_HISTORY_MINUTES as i32)
        .bind(history_cap)
        .fetch_all(&pool)
        .await
        .unwrap_or_default();

        for row in rows {
            if let Some(id) = message_id(&row.data) {
                if !seen.insert(id) {
                    continue;
                }
            }
            if let Ok(payload) = serde_json::to_string(&row.data) {
                yield Ok(Event::default().event("messageCreated").data(payload));
            }
        }

        tokio::pin!(live);
        while let Some((_subject, payload)) = live.next().await {
            if let Ok(data) = serde_json::from_str::<Value>(&payload) {
                if let Some(id) = message_id(&data) {
                    if !seen.insert(id) {
                        continue;
                    }
                }
            }
            yield Ok(Event::default().event("messageCreated").data(payload));
        }
    };

    Sse::new(event_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// `GET /api/logs/stream` — live-only (logs are not persisted to a
/// history table, spec §4.9: "best-effort").
pub async fn stream_logs(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let pattern = format!("{}.*.log", state.event_root);
    let live = state.broker.subscribe(&pattern);

    let event_stream = async_stream::stream! {
        tokio::pin!(live);
        while let Some((_subject, payload)) = live.next().await {
            yield Ok(Event::default().event("log").data(payload));
        }
    };

    Sse::new(event_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn message_id(envelope: &Value) -> Option<String> {
    envelope.get("message")?.get("id")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_extracts_nested_field() {
        let envelope = serde_json::json!({"message": {"id": "abc-123"}});
        assert_eq!(message_id(&envelope), Some("abc-123".to_string()));
    }

    #[test]
    fn message_id_missing_returns_none() {
        let envelope = serde_json::json!({"type": "ContextUpdated"});
        assert_eq!(message_id(&envelope), None);
    }
}
