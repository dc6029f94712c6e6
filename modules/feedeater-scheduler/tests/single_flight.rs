use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedeater_scheduler::{JobQueue, JobRunner, StatusSink};
use serde_json::Value;
use uuid::Uuid;

struct NoopStatusSink;

#[async_trait]
impl StatusSink for NoopStatusSink {
    async fn mark_running(&self, _instance_id: Uuid, _module: &str, _job: &str, _queue: &str) {}
    async fn mark_finished(&self, _instance_id: Uuid, _module: &str, _job: &str, _result: Result<Value, String>) {}
}

/// A runner that sleeps, tracking the peak number of concurrent
/// executions it observed across all calls.
struct SlowRunner {
    concurrent: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl JobRunner for SlowRunner {
    async fn run(&self, _module: &str, _job: &str) -> Result<Value, String> {
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn queue_never_runs_two_instances_concurrently() {
    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(SlowRunner { concurrent: concurrent.clone(), peak: peak.clone() });
    let status = Arc::new(NoopStatusSink);

    let queue = JobQueue::spawn("bybit:stream", runner, status);

    // Fire several manual triggers back to back, as a burst of "run now"
    // requests arriving while a scheduled instance might also be pending.
    for _ in 0..5 {
        queue.enqueue_manual("bybit", "stream");
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(peak.load(Ordering::SeqCst), 1, "queue must process at most one instance at a time");
}

#[tokio::test]
async fn scheduled_ticks_coalesce_while_pending() {
    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let runner = Arc::new(SlowRunner { concurrent, peak });
    let status = Arc::new(NoopStatusSink);

    let queue = JobQueue::spawn("rss:poll", runner, status);

    // Several scheduled ticks arriving before the worker has dequeued the
    // first one should collapse into a single pending instance.
    queue.enqueue_scheduled("rss", "poll");
    queue.enqueue_scheduled("rss", "poll");
    queue.enqueue_scheduled("rss", "poll");

    tokio::time::sleep(Duration::from_millis(100)).await;

    // After the first instance starts, the pending flag is cleared, so a
    // fresh scheduled tick can enqueue a second instance.
    queue.enqueue_scheduled("rss", "poll");

    tokio::time::sleep(Duration::from_millis(100)).await;
}
