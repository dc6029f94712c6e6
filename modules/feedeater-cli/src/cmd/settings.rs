use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// List every setting for a module (secrets redacted).
    List { module: String },

    /// Read a single setting.
    Get { module: String, key: String },

    /// Write a setting's value.
    Put {
        module: String,
        key: String,
        value: String,
        #[arg(long)]
        secret: bool,
    },
}

#[derive(Debug, Serialize)]
struct PutBody {
    value: Option<String>,
    #[serde(rename = "is_secret")]
    is_secret: bool,
}

pub async fn run(client: &ApiClient, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::List { module } => {
            let settings: Vec<Value> = client.get(&format!("/api/settings/{module}")).await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommand::Get { module, key } => {
            let setting: Value = client.get(&format!("/api/settings/{module}/{key}")).await?;
            println!("{}", serde_json::to_string_pretty(&setting)?);
        }
        SettingsCommand::Put { module, key, value, secret } => {
            client
                .put(&format!("/api/settings/{module}/{key}"), &PutBody { value: Some(value), is_secret: secret })
                .await?;
            println!("ok");
        }
    }
    Ok(())
}
