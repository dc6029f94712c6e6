use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum JobsCommand {
    /// Show the per-(module, job) status table.
    Status,

    /// Manually enqueue a job (spec §8 scenario S3).
    Run { module: String, job: String },
}

#[derive(Debug, Serialize)]
struct RunJobBody {
    module: String,
    job: String,
}

pub async fn run(client: &ApiClient, command: JobsCommand) -> Result<()> {
    match command {
        JobsCommand::Status => {
            let jobs: Vec<Value> = client.get("/api/jobs/status").await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
        JobsCommand::Run { module, job } => {
            let response: Value = client.post("/api/jobs/run", &RunJobBody { module, job }).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
