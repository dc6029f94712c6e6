//! RSS/Atom polling collector (spec §8 scenario S1): one bounded sweep
//! fetches every configured feed, inserts new entries idempotently, and
//! publishes `MessageCreated` for each fresh one. Grounded on the shared
//! ingestor session shape from spec §4.5 via `feedeater-collector`'s
//! `Budget`/`EventPipeline`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser as feed_parser;
use feedeater_ai::Embedder;
use feedeater_broker::BrokerClient;
use feedeater_collector::budget::Budget;
use feedeater_collector::pipeline::{guarded, EventPipeline};
use feedeater_collector::{Collector, ContextMetrics as CollectorContextMetrics, SweepMetrics};
use feedeater_common::model::{ContextRef, Message, MessageSource};
use feedeater_context::ContextEngine;
use feedeater_idempotency::derive_message_id;
use feedeater_schema::SchemaManager;
use feedeater_settings::SettingsRegistry;
use pgvector::Vector;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context_source::RssContextSource;
use crate::manifest::MODULE_NAME;
use crate::schema::DDL;
use crate::settings::RssSettings;

/// One decoded feed entry, independent of the feed-rs `Entry` type so the
/// decode step can be unit-tested without a database.
struct DecodedItem {
    source_id: String,
    title: String,
    link: Option<String>,
    author: Option<String>,
    published_at: Option<chrono::DateTime<Utc>>,
    content: String,
}

fn decode_entries(body: &[u8]) -> anyhow::Result<Vec<DecodedItem>> {
    let feed = feed_parser::parse(body)?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let content = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_else(|| title.clone());

            DecodedItem {
                source_id: entry.id,
                link: entry.links.first().map(|l| l.href.clone()),
                author: entry.authors.first().map(|p| p.name.clone()),
                published_at: entry.published.or(entry.updated),
                content,
                title,
            }
        })
        .collect())
}

pub struct RssCollector {
    pool: PgPool,
    broker: BrokerClient,
    settings: Arc<SettingsRegistry>,
    http: reqwest::Client,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn feedeater_ai::Summarizer>,
}

impl RssCollector {
    pub fn new(
        pool: PgPool,
        broker: BrokerClient,
        settings: Arc<SettingsRegistry>,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn feedeater_ai::Summarizer>,
    ) -> Self {
        Self { pool, broker, settings, http: reqwest::Client::new(), embedder, summarizer }
    }

    async fn poll_feed(&self, feed_url: &str, metrics: &mut SweepMetrics) {
        let body = match self.http.get(feed_url).send().await {
            Ok(resp) => match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(feed_url, error = %e, "failed to read feed response body");
                    metrics.increment("feeds_errored");
                    return;
                }
            },
            Err(e) => {
                warn!(feed_url, error = %e, "failed to fetch feed");
                metrics.increment("feeds_errored");
                return;
            }
        };

        let entries = match decode_entries(&body) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(feed_url, error = %e, "failed to parse feed");
                metrics.increment("feeds_errored");
                return;
            }
        };

        let mut inserted_any = false;
        let pipeline = EventPipeline::new(&self.broker, MODULE_NAME, false);

        for entry in entries {
            let DecodedItem { source_id, title, link, author, published_at, content } = entry;
            let natural_key = format!("{feed_url}:{source_id}");
            let message_id = derive_message_id(MODULE_NAME, &natural_key);

            guarded("insert", &natural_key, || async {
                let inserted = self
                    .insert_item(message_id, feed_url, &source_id, &title, link.as_deref(), author.as_deref(), published_at, &content)
                    .await
                    .map_err(|e| e.to_string())?;

                if inserted {
                    inserted_any = true;
                    metrics.increment("items_inserted");

                    let message = Message {
                        id: message_id,
                        created_at: Utc::now(),
                        source: MessageSource { module: MODULE_NAME.to_string(), stream: Some(feed_url.to_string()) },
                        realtime: false,
                        message: content.clone(),
                        from: author.clone(),
                        context_ref: Some(ContextRef { owner_module: MODULE_NAME.to_string(), source_key: feed_url.to_string() }),
                        follow_me_panel: None,
                        is_direct_mention: false,
                        is_digest: false,
                        is_system_message: false,
                        likes: 0,
                        tags: HashMap::new(),
                    };

                    pipeline.publish_if_applicable(message, inserted).await.map_err(|e| e.to_string())?;

                    if let Err(e) = self.embed_item_if_enabled(message_id, &content).await {
                        warn!(feed_url, natural_key, error = %e, "failed to embed new item, continuing");
                    }
                }

                Ok::<(), String>(())
            })
            .await;
        }

        if !inserted_any {
            metrics.increment("feeds_unchanged");
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_item(
        &self,
        id: Uuid,
        feed_url: &str,
        source_id: &str,
        title: &str,
        link: Option<&str>,
        author: Option<&str>,
        published_at: Option<chrono::DateTime<Utc>>,
        content: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"INSERT INTO "mod_rss"."rss_items" (id, feed_url, source_id, title, link, author, published_at, content, message_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $1)
               ON CONFLICT (feed_url, source_id) DO NOTHING"#,
        )
        .bind(id)
        .bind(feed_url)
        .bind(source_id)
        .bind(title)
        .bind(link)
        .bind(author)
        .bind(published_at)
        .bind(content)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn embed_item_if_enabled(&self, item_id: Uuid, content: &str) -> anyhow::Result<()> {
        let embedding = self.embedder.embed(content).await?;
        let vector = Vector::from(embedding);

        sqlx::query(
            r#"INSERT INTO "mod_rss"."rss_items_embeddings" (item_id, embedding, updated_at)
               VALUES ($1, $2, now())
               ON CONFLICT (item_id) DO UPDATE SET embedding = EXCLUDED.embedding, updated_at = now()"#,
        )
        .bind(item_id)
        .bind(vector)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Collector for RssCollector {
    fn module_name(&self) -> &str {
        MODULE_NAME
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        let manager = SchemaManager::new(self.pool.clone());
        manager.ensure_schema(MODULE_NAME, DDL).await?;

        let settings = RssSettings::load(&self.settings).await?;
        manager
            .ensure_embedding_dimension(MODULE_NAME, "rss_items_embeddings", "embedding", settings.embedding_dim)
            .await?;

        Ok(())
    }

    async fn run_sweep(&self, budget: Budget) -> SweepMetrics {
        let mut metrics = SweepMetrics::new();

        let settings = match RssSettings::load(&self.settings).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(module = MODULE_NAME, error = %e, "failed to load settings, skipping sweep");
                metrics.set("settings_error", true);
                return metrics;
            }
        };

        for feed_url in &settings.feed_urls {
            if budget.is_expired() {
                info!(module = MODULE_NAME, "sweep budget exhausted, stopping early");
                break;
            }

            let timed = budget.or_cancel(self.poll_feed(feed_url, &mut metrics)).await;
            if timed.is_none() {
                warn!(module = MODULE_NAME, feed_url, "feed poll exceeded remaining budget");
                break;
            }
        }

        metrics
    }

    async fn refresh_contexts(&self, lookback: Duration) -> CollectorContextMetrics {
        let source = Arc::new(RssContextSource::new(self.pool.clone()));
        let engine = ContextEngine::new(
            Arc::new(self.broker.clone()),
            source,
            self.summarizer.clone(),
            self.embedder.clone(),
        );

        let metrics = engine.refresh(lookback).await;
        CollectorContextMetrics {
            updated: metrics.updated,
            ai_summaries: metrics.ai_summaries,
            fallback_summaries: metrics.fallback_summaries,
            embeddings_inserted: metrics.embeddings_inserted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
    <rss version="2.0">
      <channel>
        <title>Example Feed</title>
        <item>
          <title>First post</title>
          <link>https://example.com/first</link>
          <guid>https://example.com/first</guid>
          <description>Hello world</description>
        </item>
        <item>
          <title>Second post</title>
          <link>https://example.com/second</link>
          <guid>https://example.com/second</guid>
          <description>Another item</description>
        </item>
      </channel>
    </rss>"#;

    #[test]
    fn decode_entries_extracts_title_link_and_content() {
        let entries = decode_entries(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "First post");
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/first"));
        assert_eq!(entries[0].content, "Hello world");
    }

    #[test]
    fn decode_entries_same_feed_yields_same_natural_keys() {
        let first_pass = decode_entries(SAMPLE_RSS.as_bytes()).unwrap();
        let second_pass = decode_entries(SAMPLE_RSS.as_bytes()).unwrap();

        let ids_a: Vec<Uuid> = first_pass
            .iter()
            .map(|e| derive_message_id(MODULE_NAME, &format!("https://feeds.example/a.xml:{}", e.source_id)))
            .collect();
        let ids_b: Vec<Uuid> = second_pass
            .iter()
            .map(|e| derive_message_id(MODULE_NAME, &format!("https://feeds.example/a.xml:{}", e.source_id)))
            .collect();

        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn decode_entries_rejects_garbage() {
        assert!(decode_entries(b"not a feed").is_err());
    }
}
