//! Process entry point (spec §4.11): wires the store, broker, settings
//! registry, AI client, every registered collector module, the scheduler,
//! the bus persister, and the operational HTTP surface into one running
//! process. Grounded on `rootsignal-server::main`'s overall shape
//! (tracing init -> config load -> pool connect -> schema -> construct
//! deps -> build router -> serve), retargeted from its Restate-workflow
//! wiring to FeedEater's module-host/scheduler wiring.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use feedeater_ai::FeedAiClient;
use feedeater_api::AppState;
use feedeater_broker::BrokerClient;
use feedeater_collector::Collector;
use feedeater_common::config::{Config, LogFormat};
use feedeater_host::{CollectorJobRunner, ModuleHost};
use feedeater_scheduler::{CronSchedule, JobQueue, JobStatusStore, Scheduler};
use feedeater_settings::SettingsRegistry;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

/// Sweep budget per job invocation, the wall-clock ceiling every
/// collector's `run_sweep` races its work against (spec §4.5, §5).
const SWEEP_BUDGET: Duration = Duration::from_secs(55);

/// How far back `refreshContexts` looks for active source keys (spec
/// §4.7's default lookback window for a context refresh pass).
const CONTEXT_LOOKBACK: Duration = Duration::from_secs(60 * 60);

/// Cap on rows returned by `/api/bus/history` and the initial slice of
/// `/api/bus/stream` (spec §4.10).
const BUS_HISTORY_CAP: i64 = 500;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::daemon_from_env();
    init_tracing(config.log_format);
    config.log_redacted();

    tracing::info!("starting feedeater-daemon");

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database_url).await?;
    tracing::info!("connected to database");

    feedeater_schema::ensure_core_tables(&pool).await?;

    let broker = BrokerClient::connect(pool.clone(), config.event_root.clone()).await?;
    let settings = Arc::new(SettingsRegistry::new(pool.clone()));

    let ai_client = Arc::new(FeedAiClient::new(config.feed_api_base_url.clone(), config.feed_internal_token.clone()));
    let embedder: Arc<dyn feedeater_ai::Embedder> = ai_client.clone();
    let summarizer: Arc<dyn feedeater_ai::Summarizer> = ai_client;

    let mut host = ModuleHost::new();

    let rss_manifest = feedeater_module_rss::manifest();
    let rss_collector = Arc::new(feedeater_module_rss::RssCollector::new(
        pool.clone(),
        broker.clone(),
        settings.clone(),
        embedder.clone(),
        summarizer.clone(),
    ));
    feedeater_host::bind_settings(&settings, &rss_manifest).await?;
    rss_collector.ensure_schema().await?;
    host.register(rss_manifest, rss_collector);

    let ticker_manifest = feedeater_module_ticker::manifest();
    let ticker_collector = Arc::new(feedeater_module_ticker::TickerCollector::new(
        pool.clone(),
        broker.clone(),
        settings.clone(),
        embedder,
        summarizer,
    ));
    feedeater_host::bind_settings(&settings, &ticker_manifest).await?;
    ticker_collector.ensure_schema().await?;
    host.register(ticker_manifest, ticker_collector);

    let host = Arc::new(host);
    tracing::info!(modules = host.manifests().count(), "modules registered");

    let runner: Arc<dyn feedeater_scheduler::JobRunner> =
        Arc::new(CollectorJobRunner::new(host.clone(), SWEEP_BUDGET, CONTEXT_LOOKBACK));
    let status: Arc<dyn feedeater_scheduler::StatusSink> = Arc::new(JobStatusStore::new(pool.clone()));

    let mut queues: HashMap<String, Arc<JobQueue>> = HashMap::new();
    let mut scheduler = Scheduler::new();

    for manifest in host.manifests() {
        for queue_name in &manifest.queues {
            if queues.contains_key(queue_name) {
                continue;
            }
            let queue = Arc::new(JobQueue::spawn(queue_name.clone(), runner.clone(), status.clone()));
            scheduler.register_queue(queue.clone());
            queues.insert(queue_name.clone(), queue);
        }
    }

    for manifest in host.manifests() {
        for job in &manifest.jobs {
            let Some(raw_schedule) = &job.schedule else { continue };
            let schedule = CronSchedule::parse(raw_schedule)?;
            scheduler.spawn_ticker(manifest.name.clone(), job.name.clone(), &job.queue, schedule);
        }
    }

    feedeater_api::persister::spawn(pool.clone(), broker.clone(), config.event_root.clone());

    let state = Arc::new(AppState {
        pool,
        broker,
        settings,
        host,
        queues,
        event_root: config.event_root.clone(),
        history_cap: BUS_HISTORY_CAP,
    });

    let router = feedeater_api::build_router(state);
    let addr = format!("{}:{}", config.daemon_host, config.daemon_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
