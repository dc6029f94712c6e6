pub mod aggregate;
pub mod budget;
pub mod connection;
pub mod pipeline;
pub mod ratelimit;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use budget::Budget;
use serde_json::Value;

/// Conventional `SweepMetrics` key a collector sets when its circuit
/// breaker trips mid-sweep (spec §8 scenario S4): the job host treats a
/// sweep that sets this key as an `error` outcome even though metrics
/// were still produced.
pub const CIRCUIT_BREAKER_TRIPPED_KEY: &str = "circuitBreakerTripped";

/// Free-form metrics accumulated over one sweep, matching spec §3's
/// "`lastMetrics` (free-form map of scalars)" and the per-scenario metric
/// names in §8 (`trades_collected`, `feeds_unchanged`, etc).
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics(pub HashMap<String, Value>);

impl SweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        let entry = self.0.entry(key.to_string()).or_insert(Value::from(0));
        if let Some(n) = entry.as_i64() {
            *entry = Value::from(n + 1);
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextMetrics {
    pub updated: u64,
    pub ai_summaries: u64,
    pub fallback_summaries: u64,
    pub embeddings_inserted: u64,
}

/// The strategy every collector module instantiates, per spec §9's
/// re-architecture note: "collapse into a collector strategy: a
/// protocol/interface with `ensureSchema`, `runSweep(budget) → metrics`,
/// `refreshContexts(lookback) → metrics`, plus module-specific decode."
/// Shared reconnect/backoff/circuit-breaker/log-publish behavior is
/// composed from `connection`, `budget`, and `pipeline`, not inherited.
#[async_trait]
pub trait Collector: Send + Sync {
    fn module_name(&self) -> &str;

    async fn ensure_schema(&self) -> anyhow::Result<()>;

    async fn run_sweep(&self, budget: Budget) -> SweepMetrics;

    async fn refresh_contexts(&self, lookback: Duration) -> ContextMetrics;
}
