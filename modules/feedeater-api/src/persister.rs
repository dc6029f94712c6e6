//! Bus persister (spec §4.10): subscribes to `<root>.*.messageCreated`
//! and copies each envelope into `bus_messages`, deduped by the message's
//! natural id so a re-delivered envelope never produces a second row.

use feedeater_broker::BrokerClient;
use serde_json::Value;
use sqlx::PgPool;
use tokio_stream::StreamExt;
use tracing::warn;
use uuid::Uuid;

pub fn spawn(pool: PgPool, broker: BrokerClient, event_root: String) {
    tokio::spawn(async move {
        let pattern = format!("{event_root}.*.messageCreated");
        let mut stream = broker.subscribe(&pattern);

        while let Some((subject, payload)) = stream.next().await {
            if let Err(e) = persist_one(&pool, &subject, &payload).await {
                warn!(subject, error = %e, "failed to persist bus message");
            }
        }
    });
}

async fn persist_one(pool: &PgPool, subject: &str, payload: &str) -> anyhow::Result<()> {
    let data: Value = serde_json::from_str(payload)?;
    let message_id = data
        .get("message")
        .and_then(|m| m.get("id"))
        .and_then(|id| id.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());
    // Context summaries are attached later by the context engine, not at
    // message-creation time.
    let context_summary_short: Option<String> = None;

    sqlx::query(
        r#"
        INSERT INTO bus_messages (subject, message_id, context_summary_short, data)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (message_id) WHERE message_id IS NOT NULL DO NOTHING
        "#,
    )
    .bind(subject)
    .bind(message_id)
    .bind(context_summary_short)
    .bind(&data)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_id_from_envelope() {
        let data: Value = serde_json::json!({
            "type": "MessageCreated",
            "message": { "id": "11111111-1111-1111-1111-111111111111" }
        });
        let id = data.get("message").and_then(|m| m.get("id")).and_then(|id| id.as_str());
        assert_eq!(id, Some("11111111-1111-1111-1111-111111111111"));
    }
}
