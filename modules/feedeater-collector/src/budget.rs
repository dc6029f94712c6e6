//! Wall-clock budget bounding one collector invocation, per spec §4.5(a)
//! and §5: "every collector invocation carries a wall-clock budget; on
//! expiry, it closes transports and returns accumulated metrics."

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct Budget {
    deadline: Instant,
    cancellation: CancellationToken,
}

impl Budget {
    pub fn new(duration: Duration) -> Self {
        Self { deadline: Instant::now() + duration, cancellation: CancellationToken::new() }
    }

    /// Streaming-job default of ~55 seconds (spec §4.5(a)).
    pub fn streaming_default() -> Self {
        Self::new(Duration::from_secs(55))
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero() || self.cancellation.is_cancelled()
    }

    /// Used by the process supervisor on shutdown to cancel all running
    /// collector invocations cooperatively (spec §5).
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Races `fut` against both the deadline and cooperative cancellation.
    /// Returns `None` if the budget expired or was cancelled first.
    pub async fn or_cancel<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            result = fut => Some(result),
            _ = tokio::time::sleep_until(self.deadline) => None,
            _ = self.cancellation.cancelled() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn or_cancel_returns_none_past_deadline() {
        let budget = Budget::new(Duration::from_millis(10));
        let result = budget
            .or_cancel(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "done"
            })
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn or_cancel_returns_value_when_fast_enough() {
        let budget = Budget::new(Duration::from_secs(5));
        let result = budget.or_cancel(async { "done" }).await;
        assert_eq!(result, Some("done"));
    }

    #[test]
    fn is_expired_false_for_fresh_budget() {
        let budget = Budget::new(Duration::from_secs(5));
        assert!(!budget.is_expired());
    }

    #[test]
    fn cancel_marks_budget_expired() {
        let budget = Budget::new(Duration::from_secs(5));
        budget.cancel();
        assert!(budget.is_expired());
    }
}
