use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Wraps a `reqwest::Client` pointed at one daemon's base URL. Every
/// method maps 1:1 to one operational route from spec §4.10.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("GET {path} failed: {}", response.status());
        }
        Ok(response.json().await?)
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.put(&url).json(body).send().await?;
        if !response.status().is_success() {
            bail!("PUT {path} failed: {}", response.status());
        }
        Ok(())
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            bail!("POST {path} failed: {}", response.status());
        }
        Ok(response.json().await?)
    }
}
