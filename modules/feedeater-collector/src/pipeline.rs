//! Per-event pipeline (spec §4.5(c)): decode → derive id → insert with
//! `ON CONFLICT DO NOTHING` → publish if fresh → optionally embed. Every
//! step is guarded so a single malformed event never kills the session.

use std::future::Future;

use feedeater_broker::BrokerClient;
use feedeater_common::model::{BusEnvelope, Message};
use tracing::warn;

/// Runs one pipeline step, logging and swallowing any error instead of
/// propagating it. This is the structural enforcement of spec §4.5(c)'s
/// "steps 3-5 must survive individual failures" and §7's per-event decode
/// / per-event persistence error categories.
pub async fn guarded<F, Fut, E>(step: &str, natural_key: &str, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if let Err(e) = f().await {
        warn!(step, natural_key, error = %e, "pipeline step failed, skipping event");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("message validation failed: {0}")]
    Validation(#[from] feedeater_common::model::MessageValidationError),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Publishes a freshly-inserted (or, for `publish_always` modules,
/// any) message as a `MessageCreated` envelope. Validates
/// `source.module` against the publishing module first (spec §3, §8.3).
pub struct EventPipeline<'a> {
    broker: &'a BrokerClient,
    module: &'a str,
    publish_always: bool,
}

impl<'a> EventPipeline<'a> {
    pub fn new(broker: &'a BrokerClient, module: &'a str, publish_always: bool) -> Self {
        Self { broker, module, publish_always }
    }

    pub async fn publish_if_applicable(
        &self,
        message: Message,
        inserted_fresh: bool,
    ) -> Result<(), PipelineError> {
        if !(inserted_fresh || self.publish_always) {
            return Ok(());
        }

        message.validate(self.module)?;
        let subject = self.broker.subject_for(self.module, "messageCreated");
        let envelope = BusEnvelope::MessageCreated { message };
        let payload = serde_json::to_string(&envelope)?;
        self.broker.publish(&subject, &payload).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guarded_swallows_step_errors() {
        let mut ran_after = false;
        guarded("decode", "key-1", || async { Err::<(), &str>("boom") }).await;
        ran_after = true;
        assert!(ran_after);
    }

    #[tokio::test]
    async fn guarded_runs_ok_steps() {
        let mut touched = false;
        guarded("decode", "key-1", || async {
            touched = true;
            Ok::<(), &str>(())
        })
        .await;
        assert!(touched);
    }
}
