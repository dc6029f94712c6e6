//! Per-module log stream (spec §4.9): every module logs through here,
//! which both emits a `tracing` event and best-effort publishes the same
//! entry on `<root>.<module>.log`. Publish failures are swallowed —
//! `BrokerClient::publish` already does this — so this never surfaces
//! upward into collector code.

use chrono::Utc;
use feedeater_broker::BrokerClient;
use feedeater_common::model::{LogEntry, LogLevel};
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct ModuleLogger {
    broker: BrokerClient,
    module: String,
}

impl ModuleLogger {
    pub fn new(broker: BrokerClient, module: impl Into<String>) -> Self {
        Self { broker, module: module.into() }
    }

    pub async fn log(&self, level: LogLevel, source: &str, message: &str, meta: Option<Value>) {
        match level {
            LogLevel::Debug => debug!(module = %self.module, source, "{message}"),
            LogLevel::Info => info!(module = %self.module, source, "{message}"),
            LogLevel::Warn => warn!(module = %self.module, source, "{message}"),
            LogLevel::Error => error!(module = %self.module, source, "{message}"),
        }

        let entry = LogEntry {
            level,
            module: self.module.clone(),
            source: source.to_string(),
            at: Utc::now(),
            message: message.to_string(),
            meta,
        };

        let Ok(payload) = serde_json::to_string(&entry) else { return };
        let subject = self.broker.subject_for(&self.module, "log");
        self.broker.publish(&subject, &payload).await;
    }

    pub async fn info(&self, source: &str, message: &str) {
        self.log(LogLevel::Info, source, message, None).await;
    }

    pub async fn warn(&self, source: &str, message: &str) {
        self.log(LogLevel::Warn, source, message, None).await;
    }

    pub async fn error(&self, source: &str, message: &str) {
        self.log(LogLevel::Error, source, message, None).await;
    }
}
