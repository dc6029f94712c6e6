use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum BusCommand {
    /// Query recent published messages.
    History {
        #[arg(long)]
        since_minutes: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        module: Option<String>,
        #[arg(long)]
        q: Option<String>,
    },
}

pub async fn run(client: &ApiClient, command: BusCommand) -> Result<()> {
    match command {
        BusCommand::History { since_minutes, limit, module, q } => {
            let mut query = Vec::new();
            if let Some(v) = since_minutes {
                query.push(format!("sinceMinutes={v}"));
            }
            if let Some(v) = limit {
                query.push(format!("limit={v}"));
            }
            if let Some(v) = module {
                query.push(format!("module={v}"));
            }
            if let Some(v) = q {
                query.push(format!("q={v}"));
            }
            let path = if query.is_empty() {
                "/api/bus/history".to_string()
            } else {
                format!("/api/bus/history?{}", query.join("&"))
            };

            let rows: Vec<Value> = client.get(&path).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
