use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedeater_collector::budget::Budget;
use feedeater_collector::{Collector, CIRCUIT_BREAKER_TRIPPED_KEY};
use feedeater_common::model::ModuleManifest;
use feedeater_scheduler::JobRunner;
use serde_json::Value;

/// Owns the set of registered modules for the lifetime of the process.
/// Manifests are loaded once at startup (spec §3: "Manifests are read
/// once per process lifetime; changes require a reload"); there is no
/// live-reload path.
pub struct ModuleHost {
    manifests: HashMap<String, ModuleManifest>,
    collectors: HashMap<String, Arc<dyn Collector>>,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self { manifests: HashMap::new(), collectors: HashMap::new() }
    }

    pub fn register(&mut self, manifest: ModuleManifest, collector: Arc<dyn Collector>) {
        self.collectors.insert(manifest.name.clone(), collector);
        self.manifests.insert(manifest.name.clone(), manifest);
    }

    pub fn manifests(&self) -> impl Iterator<Item = &ModuleManifest> {
        self.manifests.values()
    }

    pub fn manifest(&self, module: &str) -> Option<&ModuleManifest> {
        self.manifests.get(module)
    }

    pub fn collector(&self, module: &str) -> Option<Arc<dyn Collector>> {
        self.collectors.get(module).cloned()
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

/// The two well-known job kinds every module's manifest declares (spec
/// §4.5, §4.11): a bounded sweep and a context-refresh pass. A module may
/// name its jobs anything; the trigger class in the manifest says which
/// kind of work it performs.
pub enum JobKind {
    Sweep,
    RefreshContexts,
}

impl JobKind {
    pub fn from_trigger_class(trigger_class: &str) -> Option<Self> {
        match trigger_class {
            "sweep" => Some(JobKind::Sweep),
            "refresh_contexts" => Some(JobKind::RefreshContexts),
            _ => None,
        }
    }
}

/// Adapts `Collector::{run_sweep, refresh_contexts}` to the scheduler's
/// `JobRunner` interface, dispatching on each job's declared trigger
/// class. This is where `feedeater-host` closes the loop between the
/// manifest-driven scheduler and the per-module collector strategy.
pub struct CollectorJobRunner {
    host: Arc<ModuleHost>,
    sweep_budget: Duration,
    context_lookback: Duration,
}

impl CollectorJobRunner {
    pub fn new(host: Arc<ModuleHost>, sweep_budget: Duration, context_lookback: Duration) -> Self {
        Self { host, sweep_budget, context_lookback }
    }
}

#[async_trait]
impl JobRunner for CollectorJobRunner {
    async fn run(&self, module: &str, job: &str) -> Result<Value, String> {
        let collector = self.host.collector(module).ok_or_else(|| format!("unknown module `{module}`"))?;
        let manifest = self.host.manifest(module).ok_or_else(|| format!("unknown module `{module}`"))?;
        let declaration = manifest
            .jobs
            .iter()
            .find(|j| j.name == job)
            .ok_or_else(|| format!("module `{module}` has no job `{job}`"))?;
        let trigger_class = declaration
            .trigger_class
            .as_deref()
            .ok_or_else(|| format!("job `{module}.{job}` has no trigger class"))?;
        let kind = JobKind::from_trigger_class(trigger_class)
            .ok_or_else(|| format!("unknown trigger class `{trigger_class}`"))?;

        match kind {
            JobKind::Sweep => {
                let metrics = collector.run_sweep(Budget::new(self.sweep_budget)).await;
                let tripped = metrics.0.get(CIRCUIT_BREAKER_TRIPPED_KEY).and_then(Value::as_bool).unwrap_or(false);
                let value = serde_json::to_value(metrics.0).map_err(|e| e.to_string())?;
                if tripped {
                    Err(format!("module `{module}` circuit breaker tripped during sweep: {value}"))
                } else {
                    Ok(value)
                }
            }
            JobKind::RefreshContexts => {
                let metrics = collector.refresh_contexts(self.context_lookback).await;
                serde_json::to_value(metrics_to_map(&metrics)).map_err(|e| e.to_string())
            }
        }
    }
}

fn metrics_to_map(metrics: &feedeater_collector::ContextMetrics) -> serde_json::Map<String, Value> {
    let mut map = serde_json::Map::new();
    map.insert("updated".to_string(), Value::from(metrics.updated));
    map.insert("aiSummaries".to_string(), Value::from(metrics.ai_summaries));
    map.insert("fallbackSummaries".to_string(), Value::from(metrics.fallback_summaries));
    map.insert("embeddingsInserted".to_string(), Value::from(metrics.embeddings_inserted));
    map
}
