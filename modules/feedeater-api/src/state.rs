use std::collections::HashMap;
use std::sync::Arc;

use feedeater_broker::BrokerClient;
use feedeater_host::ModuleHost;
use feedeater_scheduler::JobQueue;
use feedeater_settings::SettingsRegistry;
use sqlx::PgPool;

pub struct AppState {
    pub pool: PgPool,
    pub broker: BrokerClient,
    pub settings: Arc<SettingsRegistry>,
    pub host: Arc<ModuleHost>,
    /// Queues keyed by queue name, as registered with the scheduler.
    pub queues: HashMap<String, Arc<JobQueue>>,
    pub event_root: String,
    /// How much history (by age) `/api/bus/history` and the default
    /// history slice for `/api/bus/stream` will return, capped per spec
    /// §4.10.
    pub history_cap: i64,
}

impl AppState {
    /// Resolves the queue a (module, job) pair dispatches onto, via the
    /// module's manifest job declaration (spec §4.10's `POST /api/jobs/run`).
    pub fn queue_for(&self, module: &str, job: &str) -> Option<Arc<JobQueue>> {
        let manifest = self.host.manifest(module)?;
        let declaration = manifest.jobs.iter().find(|j| j.name == job)?;
        self.queues.get(&declaration.queue).cloned()
    }
}
