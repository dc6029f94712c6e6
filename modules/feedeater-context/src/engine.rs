//! The context/summary engine (spec §4.11): per module, fan out over
//! distinct source keys, select relevant prior records by k-NN over
//! stored embeddings, call an AI summarizer/embedder, and publish
//! `ContextUpdated` idempotently. One failing key never aborts the sweep
//! (spec §4.11's "per-key failures are local").

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use feedeater_ai::{AiError, Embedder, Summarizer};
use feedeater_broker::BrokerClient;
use feedeater_common::model::{BusEnvelope, Context};
use tracing::warn;

use crate::selection::{build_prompt, SelectedItem};

/// Default number of top candidates pulled per source key (spec §8's S5
/// scenario uses `contextTopK = 20`).
pub const DEFAULT_TOP_K: usize = 20;

#[derive(Debug, Default, Clone)]
pub struct ContextMetrics {
    pub updated: u64,
    pub ai_summaries: u64,
    pub fallback_summaries: u64,
    pub embeddings_inserted: u64,
}

/// The module-specific half of the context engine: everything that
/// touches a module's own raw/embedding schema. A module implements this
/// once; `ContextEngine` drives the shared AI-call/fallback/publish
/// control flow on top of it.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn owner_module(&self) -> &str;

    /// Distinct source keys with raw activity since `lookback` ago.
    async fn active_source_keys(&self, lookback: Duration) -> anyhow::Result<Vec<String>>;

    async fn prior_context(&self, source_key: &str) -> anyhow::Result<Option<Context>>;

    /// Top-K candidates for `source_key`, ordered per the k-NN tie-break
    /// (ascending distance, descending timestamp, ascending id) when
    /// `query_embedding` is given, or by recency alone otherwise.
    async fn select_top_k(
        &self,
        source_key: &str,
        query_embedding: Option<&[f32]>,
        top_k: usize,
    ) -> anyhow::Result<Vec<SelectedItem>>;

    /// Writes the new context as the sole live row for this (module,
    /// source_key) pair.
    async fn upsert_context(&self, context: &Context) -> anyhow::Result<()>;
}

/// Abstracts the broker publish step so the engine's control flow can be
/// exercised without a live Postgres-backed broker. `BrokerClient` is the
/// production implementation.
#[async_trait]
pub trait ContextPublisher: Send + Sync {
    async fn publish_context_updated(&self, module: &str, context: &Context);
}

#[async_trait]
impl ContextPublisher for BrokerClient {
    async fn publish_context_updated(&self, module: &str, context: &Context) {
        let envelope =
            BusEnvelope::ContextUpdated { created_at: Utc::now(), message_id: None, context: context.clone() };
        let Ok(payload) = serde_json::to_string(&envelope) else {
            warn!(module, "failed to encode ContextUpdated envelope");
            return;
        };
        let subject = self.subject_for(module, "contextUpdated");
        self.publish(&subject, &payload).await;
    }
}

pub struct ContextEngine {
    publisher: Arc<dyn ContextPublisher>,
    source: Arc<dyn ContextSource>,
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ContextEngine {
    pub fn new(
        publisher: Arc<dyn ContextPublisher>,
        source: Arc<dyn ContextSource>,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self { publisher, source, summarizer, embedder, top_k: DEFAULT_TOP_K }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub async fn refresh(&self, lookback: Duration) -> ContextMetrics {
        let mut metrics = ContextMetrics::default();

        let keys = match self.source.active_source_keys(lookback).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(module = self.source.owner_module(), error = %e, "failed to list active source keys");
                return metrics;
            }
        };

        for key in keys {
            match self.refresh_one(&key).await {
                Ok(outcome) => {
                    metrics.updated += 1;
                    match outcome.kind {
                        RefreshKind::Ai => metrics.ai_summaries += 1,
                        RefreshKind::Fallback => metrics.fallback_summaries += 1,
                    }
                    if outcome.embedded {
                        metrics.embeddings_inserted += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        module = self.source.owner_module(),
                        source_key = key,
                        error = %e,
                        "context refresh failed for source key, continuing"
                    );
                }
            }
        }

        metrics
    }

    async fn refresh_one(&self, source_key: &str) -> anyhow::Result<RefreshOutcome> {
        let prior = self.source.prior_context(source_key).await?;
        let query_embedding = prior.as_ref().and_then(|c| c.embedding.clone());

        let candidates = self.source.select_top_k(source_key, query_embedding.as_deref(), self.top_k).await?;
        let prompt = build_prompt(prior.as_ref().map(|c| c.summary_long.as_str()), &candidates);

        let (mut context, kind) = self.summarize(source_key, &prompt).await?;

        let embedded = match self.embedder.embed(&context.summary_long).await {
            Ok(embedding) => {
                context.embedding = Some(embedding);
                true
            }
            Err(e) => {
                warn!(module = self.source.owner_module(), source_key, error = %e, "embedding call failed, publishing without one");
                false
            }
        };

        context.truncate_summary_short();
        self.source.upsert_context(&context).await?;
        self.publisher.publish_context_updated(self.source.owner_module(), &context).await;

        Ok(RefreshOutcome { kind, embedded })
    }

    /// Tries `summarize_json` first; only a JSON-decode failure falls back
    /// to `summarize_plain` (spec §4.11d). Any other error from
    /// `summarize_json` propagates so `refresh()` counts it as a per-key
    /// failure instead of silently degrading to plain text.
    async fn summarize(&self, source_key: &str, prompt: &str) -> anyhow::Result<(Context, RefreshKind)> {
        match self.summarizer.summarize_json(prompt).await {
            Ok(resp) => {
                return Ok((
                    Context {
                        owner_module: self.source.owner_module().to_string(),
                        source_key: source_key.to_string(),
                        summary_short: resp.summary_short,
                        summary_long: resp.summary_long,
                        key_points: Vec::new(),
                        embedding: None,
                    },
                    RefreshKind::Ai,
                ));
            }
            Err(AiError::Decode(e)) => {
                warn!(module = self.source.owner_module(), source_key, error = %e, "AI JSON response unparseable, falling back to plain text");
            }
            Err(e) => return Err(e.into()),
        }

        match self.summarizer.summarize_plain(prompt).await {
            Ok(text) => Ok((
                Context {
                    owner_module: self.source.owner_module().to_string(),
                    source_key: source_key.to_string(),
                    summary_short: text.chars().take(127).collect::<String>() + "…",
                    summary_long: text,
                    key_points: Vec::new(),
                    embedding: None,
                },
                RefreshKind::Fallback,
            )),
            Err(e) => {
                warn!(module = self.source.owner_module(), source_key, error = %e, "plain-text fallback also failed, emitting minimal context");
                Ok((self.minimal_context(source_key), RefreshKind::Fallback))
            }
        }
    }

    fn minimal_context(&self, source_key: &str) -> Context {
        let summary = format!("{source_key} — last updated at {}", Utc::now().to_rfc3339());
        Context {
            owner_module: self.source.owner_module().to_string(),
            source_key: source_key.to_string(),
            summary_short: summary.clone(),
            summary_long: summary,
            key_points: Vec::new(),
            embedding: None,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshKind {
    Ai,
    Fallback,
}

struct RefreshOutcome {
    kind: RefreshKind,
    embedded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct FakeSource {
        keys: Vec<String>,
        prior: Option<Context>,
    }

    #[async_trait]
    impl ContextSource for FakeSource {
        fn owner_module(&self) -> &str {
            "polymarket"
        }

        async fn active_source_keys(&self, _lookback: Duration) -> anyhow::Result<Vec<String>> {
            Ok(self.keys.clone())
        }

        async fn prior_context(&self, _source_key: &str) -> anyhow::Result<Option<Context>> {
            Ok(self.prior.clone())
        }

        async fn select_top_k(
            &self,
            _source_key: &str,
            _query_embedding: Option<&[f32]>,
            _top_k: usize,
        ) -> anyhow::Result<Vec<SelectedItem>> {
            Ok(vec![SelectedItem {
                id: Uuid::new_v4(),
                text: "trade at 0.62".to_string(),
                collected_at: Utc::now(),
                distance: Some(0.1),
            }])
        }

        async fn upsert_context(&self, _context: &Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FakeSummarizer {
        json_fails: bool,
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize_json(&self, _prompt: &str) -> Result<feedeater_ai::SummaryResponse, AiError> {
            if self.json_fails {
                return Err(AiError::Decode(serde_json::from_str::<()>("not json").unwrap_err()));
            }
            Ok(feedeater_ai::SummaryResponse {
                summary_short: "market moved up".to_string(),
                summary_long: "the market moved up on high volume".to_string(),
            })
        }

        async fn summarize_plain(&self, _prompt: &str) -> Result<String, AiError> {
            Ok("plain text fallback summary".to_string())
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }
    }

    #[derive(Default)]
    struct CapturingPublisher {
        published: Mutex<Vec<(String, Context)>>,
    }

    #[async_trait]
    impl ContextPublisher for CapturingPublisher {
        async fn publish_context_updated(&self, module: &str, context: &Context) {
            self.published.lock().unwrap().push((module.to_string(), context.clone()));
        }
    }

    #[tokio::test]
    async fn refresh_publishes_ai_summary_when_json_call_succeeds() {
        let source = Arc::new(FakeSource { keys: vec!["market-1".to_string()], prior: None });
        let publisher = Arc::new(CapturingPublisher::default());
        let engine = ContextEngine::new(
            publisher.clone(),
            source,
            Arc::new(FakeSummarizer { json_fails: false }),
            Arc::new(FakeEmbedder),
        );

        let metrics = engine.refresh(Duration::from_secs(3600)).await;

        assert_eq!(metrics.updated, 1);
        assert_eq!(metrics.ai_summaries, 1);
        assert_eq!(metrics.fallback_summaries, 0);
        assert_eq!(metrics.embeddings_inserted, 1);

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1.summary_short, "market moved up");
    }

    #[tokio::test]
    async fn refresh_falls_back_to_plain_text_on_json_decode_failure() {
        let source = Arc::new(FakeSource { keys: vec!["market-1".to_string()], prior: None });
        let publisher = Arc::new(CapturingPublisher::default());
        let engine = ContextEngine::new(
            publisher.clone(),
            source,
            Arc::new(FakeSummarizer { json_fails: true }),
            Arc::new(FakeEmbedder),
        );

        let metrics = engine.refresh(Duration::from_secs(3600)).await;

        assert_eq!(metrics.updated, 1);
        assert_eq!(metrics.ai_summaries, 0);
        assert_eq!(metrics.fallback_summaries, 1);

        let published = publisher.published.lock().unwrap();
        assert!(published[0].1.summary_long.contains("plain text fallback"));
    }

    #[tokio::test]
    async fn refresh_counts_non_decode_summarize_error_as_per_key_failure() {
        struct FailingSummarizer;

        #[async_trait]
        impl Summarizer for FailingSummarizer {
            async fn summarize_json(&self, _prompt: &str) -> Result<feedeater_ai::SummaryResponse, AiError> {
                Err(AiError::NonSuccess { status: 500, body: "boom".to_string() })
            }

            async fn summarize_plain(&self, _prompt: &str) -> Result<String, AiError> {
                Ok("should never be reached".to_string())
            }
        }

        let source = Arc::new(FakeSource { keys: vec!["market-1".to_string()], prior: None });
        let publisher = Arc::new(CapturingPublisher::default());
        let engine = ContextEngine::new(publisher.clone(), source, Arc::new(FailingSummarizer), Arc::new(FakeEmbedder));

        let metrics = engine.refresh(Duration::from_secs(3600)).await;

        assert_eq!(metrics.updated, 0);
        assert_eq!(metrics.ai_summaries, 0);
        assert_eq!(metrics.fallback_summaries, 0);
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_enforces_summary_short_length_limit() {
        struct LongSummarizer;

        #[async_trait]
        impl Summarizer for LongSummarizer {
            async fn summarize_json(&self, _prompt: &str) -> Result<feedeater_ai::SummaryResponse, AiError> {
                Ok(feedeater_ai::SummaryResponse {
                    summary_short: "x".repeat(500),
                    summary_long: "long form".to_string(),
                })
            }

            async fn summarize_plain(&self, _prompt: &str) -> Result<String, AiError> {
                Ok("plain".to_string())
            }
        }

        let source = Arc::new(FakeSource { keys: vec!["market-1".to_string()], prior: None });
        let publisher = Arc::new(CapturingPublisher::default());
        let engine = ContextEngine::new(publisher.clone(), source, Arc::new(LongSummarizer), Arc::new(FakeEmbedder));

        engine.refresh(Duration::from_secs(3600)).await;

        let published = publisher.published.lock().unwrap();
        assert!(published[0].1.summary_short.chars().count() <= feedeater_common::model::MAX_SUMMARY_SHORT_LEN);
    }

    #[tokio::test]
    async fn refresh_with_no_active_keys_produces_zero_metrics() {
        let source = Arc::new(FakeSource { keys: vec![], prior: None });
        let publisher = Arc::new(CapturingPublisher::default());
        let engine =
            ContextEngine::new(publisher, source, Arc::new(FakeSummarizer { json_fails: false }), Arc::new(FakeEmbedder));

        let metrics = engine.refresh(Duration::from_secs(3600)).await;
        assert_eq!(metrics.updated, 0);
    }
}
