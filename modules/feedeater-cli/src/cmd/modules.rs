use anyhow::Result;
use serde_json::Value;

use crate::client::ApiClient;

pub async fn list(client: &ApiClient) -> Result<()> {
    let manifests: Vec<Value> = client.get("/api/modules").await?;
    println!("{}", serde_json::to_string_pretty(&manifests)?);
    Ok(())
}
