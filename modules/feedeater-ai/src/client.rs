use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::traits::{AiError, Embedder, SummaryRequest, SummaryResponse, Summarizer};

#[derive(Clone)]
pub struct FeedAiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl FeedAiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token: token.into() }
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| AiError::NonSuccess { status: 0, body: e.to_string() })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn post_json<Req: Serialize + ?Sized, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, AiError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AiError::NonSuccess { status: status.as_u16(), body: body_text });
        }

        let parsed = response.json::<Resp>().await?;
        Ok(parsed)
    }
}

#[derive(Deserialize)]
struct PlainTextResponse {
    text: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Summarizer for FeedAiClient {
    async fn summarize_json(&self, prompt: &str) -> Result<SummaryResponse, AiError> {
        self.post_json("/summarize", &SummaryRequest { prompt: prompt.to_string() }).await
    }

    async fn summarize_plain(&self, prompt: &str) -> Result<String, AiError> {
        let resp: PlainTextResponse =
            self.post_json("/summarize/plain", &SummaryRequest { prompt: prompt.to_string() }).await?;
        Ok(resp.text)
    }
}

#[async_trait]
impl Embedder for FeedAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let texts = vec![text.to_string()];
        let mut batch = self.embed_batch(&texts).await?;
        Ok(batch.pop().unwrap_or_default())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let resp: EmbedResponse = self.post_json("/embed", &EmbedRequest { texts }).await?;
        Ok(resp.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn summarize_json_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "summary_short": "short",
                "summary_long": "long"
            })))
            .mount(&server)
            .await;

        let client = FeedAiClient::new(server.uri(), "test-token");
        let resp = client.summarize_json("prompt").await.unwrap();
        assert_eq!(resp.summary_short, "short");
    }

    #[tokio::test]
    async fn non_success_status_becomes_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = FeedAiClient::new(server.uri(), "test-token");
        let err = client.summarize_json("prompt").await.unwrap_err();
        assert!(matches!(err, AiError::NonSuccess { status: 500, .. }));
    }
}
