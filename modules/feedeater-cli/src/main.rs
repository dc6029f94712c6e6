//! Thin HTTP client wrapping the operational surface in spec §4.10, for
//! operator scripting against a running daemon.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod cmd;

use client::ApiClient;

#[derive(Parser)]
#[command(name = "feedeater")]
#[command(about = "Operator CLI for a running feedeater daemon")]
#[command(version)]
struct Cli {
    /// Base URL of the daemon's operational HTTP surface.
    #[arg(long, global = true, default_value = "http://localhost:8080", env = "FEEDEATER_API_URL")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered module's manifest.
    Modules,

    /// Read or write a module's settings.
    Settings {
        #[command(subcommand)]
        command: cmd::settings::SettingsCommand,
    },

    /// Inspect or trigger jobs.
    Jobs {
        #[command(subcommand)]
        command: cmd::jobs::JobsCommand,
    },

    /// Query recent bus history.
    Bus {
        #[command(subcommand)]
        command: cmd::bus::BusCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url);

    match cli.command {
        Commands::Modules => cmd::modules::list(&client).await,
        Commands::Settings { command } => cmd::settings::run(&client, command).await,
        Commands::Jobs { command } => cmd::jobs::run(&client, command).await,
        Commands::Bus { command } => cmd::bus::run(&client, command).await,
    }
}
