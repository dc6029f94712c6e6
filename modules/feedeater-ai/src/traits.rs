use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI service error ({status}): {body}")]
    NonSuccess { status: u16, body: String },

    #[error("failed to decode AI service response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    pub summary_short: String,
    pub summary_long: String,
}

/// JSON-then-plaintext fallback chain from spec §4.11d: callers try
/// `summarize_json` first, and only fall back to `summarize_plain` on a
/// JSON-parse failure, not on any other kind of error.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize_json(&self, prompt: &str) -> Result<SummaryResponse, AiError>;
    async fn summarize_plain(&self, prompt: &str) -> Result<String, AiError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;
}
