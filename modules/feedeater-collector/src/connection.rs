//! Reconnect/backoff/circuit-breaker state machine, per spec §4.5(b):
//!
//! ```text
//! idle → connecting → open → {open | reconnecting} → closed
//!                                    ↑       ↓
//!                               (reset)   (backoff)
//!                                           ↓
//!                                       tripped (terminal for invocation)
//! ```

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
    Tripped,
}

/// Doubling backoff with a per-module ceiling, reset to the initial delay
/// on every successful reconnect.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        Self { initial, current: initial, ceiling }
    }

    /// Module default: 1s initial, 30s ceiling (spec §4.5(b)).
    pub fn default_module() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Counts consecutive reconnect failures within one invocation. Trips at
/// `threshold`, which is terminal for the invocation — the collector does
/// not attempt to reconnect again until its next scheduled run.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self { threshold, consecutive_failures: 0 }
    }

    /// Default threshold of 10 consecutive failures (spec §4.5(b), §8).
    pub fn default_module() -> Self {
        Self::new(10)
    }

    /// Records a failed reconnect attempt. Returns `true` exactly the
    /// first time the threshold is reached (the caller should trip and
    /// publish the dead-module notification exactly once).
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures == self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn is_tripped(&self) -> bool {
        self.consecutive_failures >= self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(8));
        let delays: Vec<Duration> = (0..5).map(|_| b.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn backoff_resets_to_initial() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn circuit_breaker_trips_exactly_once_at_threshold() {
        let mut cb = CircuitBreaker::new(3);
        assert!(!cb.record_failure());
        assert!(!cb.record_failure());
        assert!(cb.record_failure());
        assert!(cb.is_tripped());
    }

    #[test]
    fn circuit_breaker_resets_on_success() {
        let mut cb = CircuitBreaker::new(3);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);
        assert!(!cb.is_tripped());
    }
}
