use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::status::StatusSink;

/// Executes one job instance and returns its metrics, or an error message
/// to record. Implemented by the module host (spec §4.8's worker pool).
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, module: &str, job: &str) -> Result<Value, String>;
}

struct Trigger {
    instance_id: Uuid,
    module: String,
    job: String,
}

/// One worker task per (module, queue), which makes single-flight a
/// structural property rather than a lock to maintain: a queue's worker
/// processes triggers strictly one at a time because it's a single
/// sequential loop (spec §5's "primary concurrency invariant").
pub struct JobQueue {
    name: String,
    tx: mpsc::UnboundedSender<Trigger>,
    /// True while a scheduled instance is enqueued but not yet started.
    /// Used to coalesce missed ticks (spec §4.8): at most one pending
    /// instance per job while the worker is busy with the current one.
    scheduled_pending: Arc<AtomicBool>,
}

impl JobQueue {
    pub fn spawn(
        name: impl Into<String>,
        runner: Arc<dyn JobRunner>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Trigger>();
        let scheduled_pending = Arc::new(AtomicBool::new(false));
        let worker_pending = scheduled_pending.clone();
        let queue_name = name.into();
        let worker_queue_name = queue_name.clone();

        tokio::spawn(async move {
            while let Some(trigger) = rx.recv().await {
                worker_pending.store(false, Ordering::SeqCst);
                status
                    .mark_running(trigger.instance_id, &trigger.module, &trigger.job, &worker_queue_name)
                    .await;
                let result = runner.run(&trigger.module, &trigger.job).await;
                status.mark_finished(trigger.instance_id, &trigger.module, &trigger.job, result).await;
            }
        });

        Self { name: queue_name, tx, scheduled_pending }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A scheduled tick fired. Coalesced into the existing pending
    /// instance if one hasn't started yet.
    pub fn enqueue_scheduled(&self, module: &str, job: &str) {
        if self.scheduled_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Trigger {
            instance_id: Uuid::new_v4(),
            module: module.to_string(),
            job: job.to_string(),
        });
    }

    /// A manual "run now" request. Always enqueues, queuing behind any
    /// currently running instance; returns the new instance id (spec §4.8,
    /// §8 scenario S3).
    pub fn enqueue_manual(&self, module: &str, job: &str) -> Uuid {
        let instance_id = Uuid::new_v4();
        let _ = self.tx.send(Trigger {
            instance_id,
            module: module.to_string(),
            job: job.to_string(),
        });
        instance_id
    }
}
