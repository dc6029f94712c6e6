//! `ContextSource` implementation for the RSS module: per-feed context
//! keyed by feed URL, selecting prior entries via cosine distance over
//! `rss_items_embeddings`, falling back to recency when no query
//! embedding is available (spec §4.11(b)).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedeater_common::model::Context;
use feedeater_context::{ContextSource, SelectedItem};
use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use crate::manifest::MODULE_NAME;

pub struct RssContextSource {
    pool: PgPool,
}

impl RssContextSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    content: String,
    collected_at: DateTime<Utc>,
    distance: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    summary_short: String,
    summary_long: String,
    key_points: serde_json::Value,
    embedding: Option<Vector>,
}

#[async_trait]
impl ContextSource for RssContextSource {
    fn owner_module(&self) -> &str {
        MODULE_NAME
    }

    async fn active_source_keys(&self, lookback: Duration) -> anyhow::Result<Vec<String>> {
        let lookback_mins = (lookback.as_secs() / 60).max(1) as i32;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT DISTINCT feed_url FROM "mod_rss"."rss_items"
               WHERE collected_at >= now() - make_interval(mins => $1)"#,
        )
        .bind(lookback_mins)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(feed_url,)| feed_url).collect())
    }

    async fn prior_context(&self, source_key: &str) -> anyhow::Result<Option<Context>> {
        let row: Option<ContextRow> = sqlx::query_as(
            r#"SELECT summary_short, summary_long, key_points, embedding
               FROM bus_contexts WHERE owner_module = $1 AND source_key = $2"#,
        )
        .bind(MODULE_NAME)
        .bind(source_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Context {
            owner_module: MODULE_NAME.to_string(),
            source_key: source_key.to_string(),
            summary_short: r.summary_short,
            summary_long: r.summary_long,
            key_points: serde_json::from_value(r.key_points).unwrap_or_default(),
            embedding: r.embedding.map(|v| v.to_vec()),
        }))
    }

    async fn select_top_k(
        &self,
        source_key: &str,
        query_embedding: Option<&[f32]>,
        top_k: usize,
    ) -> anyhow::Result<Vec<SelectedItem>> {
        let rows: Vec<ItemRow> = match query_embedding {
            Some(embedding) => {
                let vector = Vector::from(embedding.to_vec());
                sqlx::query_as(
                    r#"SELECT i.id, i.content, i.collected_at, (e.embedding <=> $2) AS distance
                       FROM "mod_rss"."rss_items" i
                       JOIN "mod_rss"."rss_items_embeddings" e ON e.item_id = i.id
                       WHERE i.feed_url = $1 AND e.embedding IS NOT NULL
                       ORDER BY e.embedding <=> $2 ASC, i.collected_at DESC, i.id ASC
                       LIMIT $3"#,
                )
                .bind(source_key)
                .bind(vector)
                .bind(top_k as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"SELECT id, content, collected_at, NULL::float8 AS distance
                       FROM "mod_rss"."rss_items"
                       WHERE feed_url = $1
                       ORDER BY collected_at DESC, id ASC
                       LIMIT $2"#,
                )
                .bind(source_key)
                .bind(top_k as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|r| SelectedItem { id: r.id, text: r.content, collected_at: r.collected_at, distance: r.distance })
            .collect())
    }

    async fn upsert_context(&self, context: &Context) -> anyhow::Result<()> {
        let embedding = context.embedding.clone().map(Vector::from);
        let key_points = serde_json::to_value(&context.key_points)?;

        sqlx::query(
            r#"INSERT INTO bus_contexts (owner_module, source_key, summary_short, summary_long, key_points, embedding, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, now())
               ON CONFLICT (owner_module, source_key) DO UPDATE SET
                   summary_short = EXCLUDED.summary_short,
                   summary_long = EXCLUDED.summary_long,
                   key_points = EXCLUDED.key_points,
                   embedding = EXCLUDED.embedding,
                   updated_at = now()"#,
        )
        .bind(&context.owner_module)
        .bind(&context.source_key)
        .bind(&context.summary_short)
        .bind(&context.summary_long)
        .bind(key_points)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
