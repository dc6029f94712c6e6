use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::cron_schedule::CronSchedule;
use crate::queue::JobQueue;

/// Top-level dispatcher: one background tick task per scheduled
/// (module, job), each driving its queue's `enqueue_scheduled`. Manual
/// triggers bypass this entirely and call `JobQueue::enqueue_manual`
/// directly from the operational HTTP surface.
pub struct Scheduler {
    queues: HashMap<String, Arc<JobQueue>>,
    /// Per-module pause flag. A settings-validation error is the only
    /// failure mode that disables future ticks (spec §4.3, §7) — it is
    /// fix-forward, lifted by an operator correcting the setting.
    paused: HashMap<String, Arc<AtomicBool>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { queues: HashMap::new(), paused: HashMap::new() }
    }

    pub fn register_queue(&mut self, queue: Arc<JobQueue>) {
        self.queues.insert(queue.name().to_string(), queue);
    }

    fn pause_flag(&mut self, module: &str) -> Arc<AtomicBool> {
        self.paused.entry(module.to_string()).or_insert_with(|| Arc::new(AtomicBool::new(false))).clone()
    }

    pub fn pause(&mut self, module: &str) {
        self.pause_flag(module).store(true, Ordering::SeqCst);
        warn!(module, "job schedule paused pending settings fix");
    }

    pub fn resume(&mut self, module: &str) {
        self.pause_flag(module).store(false, Ordering::SeqCst);
        info!(module, "job schedule resumed");
    }

    /// Starts a background ticker for one (module, job, queue, schedule)
    /// triple loaded from the module's manifest. Scheduled ticks while the
    /// module is paused are dropped, not coalesced — they resume on the
    /// next tick after `resume()`.
    pub fn spawn_ticker(
        &mut self,
        module: impl Into<String>,
        job: impl Into<String>,
        queue_name: &str,
        schedule: CronSchedule,
    ) {
        let module = module.into();
        let job = job.into();
        let Some(queue) = self.queues.get(queue_name).cloned() else {
            warn!(queue_name, module, job, "no queue registered for scheduled job");
            return;
        };
        let paused = self.pause_flag(&module);

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_after(now) else {
                    warn!(module, job, "cron schedule has no further occurrences, stopping ticker");
                    return;
                };
                let delay = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                tokio::time::sleep(delay).await;

                if paused.load(Ordering::SeqCst) {
                    continue;
                }
                queue.enqueue_scheduled(&module, &job);
            }
        });
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
