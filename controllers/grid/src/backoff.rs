//! # Fibonacci Backoff
//!
//! Retry delays for failed Grid reconciles. Delays grow along the Fibonacci
//! sequence, which is gentler than doubling: with the defaults a Grid whose
//! target is missing is retried after 5s, 5s, 10s, 15s, 25s, 40s ... up to 5m.

use std::collections::HashMap;
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min` twice and
/// capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff (for reset)
    min: Duration,
    /// Previous backoff value
    prev: Duration,
    /// Current backoff value
    current: Duration,
    /// Maximum backoff value
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new backoff yielding `min, min, 2*min, 3*min, 5*min, ...` capped at `max`
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

/// Per-Grid backoff state, keyed by `namespace/name`
#[derive(Debug)]
pub struct BackoffTable {
    min: Duration,
    max: Duration,
    states: HashMap<String, BackoffState>,
}

#[derive(Debug)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffTable {
    /// Create an empty table whose entries use the given bounds
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: HashMap::new(),
        }
    }

    /// Record a failure for `key` and return (delay before retry, consecutive errors)
    pub fn record_failure(&mut self, key: &str) -> (Duration, u32) {
        let (min, max) = (self.min, self.max);
        let state = self
            .states
            .entry(key.to_string())
            .or_insert_with(|| BackoffState {
                backoff: FibonacciBackoff::new(min, max),
                error_count: 0,
            });
        state.error_count += 1;
        (state.backoff.next_backoff(), state.error_count)
    }

    /// Forget the failures of `key` after a successful reconcile
    pub fn reset(&mut self, key: &str) {
        self.states.remove(key);
    }

    /// Consecutive failures recorded for `key`
    pub fn error_count(&self, key: &str) -> u32 {
        self.states.get(key).map_or(0, |s| s.error_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(secs(5), secs(300));

        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(10));
        assert_eq!(backoff.next_backoff(), secs(15));
        assert_eq!(backoff.next_backoff(), secs(25));
        assert_eq!(backoff.next_backoff(), secs(40));
        assert_eq!(backoff.next_backoff(), secs(65));
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(secs(60), secs(600));

        // 60, 60, 120, 180, 300, 480, then 780 capped to 600
        for _ in 0..6 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.next_backoff(), secs(600));
        // Should stay at max
        assert_eq!(backoff.next_backoff(), secs(600));
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(secs(5), secs(300));

        backoff.next_backoff();
        backoff.next_backoff();
        assert_eq!(backoff.next_backoff(), secs(10));

        backoff.reset();

        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(5));
        assert_eq!(backoff.next_backoff(), secs(10));
    }

    #[test]
    fn test_table_tracks_keys_independently() {
        let mut table = BackoffTable::new(secs(5), secs(300));

        assert_eq!(table.record_failure("shop/checkout"), (secs(5), 1));
        assert_eq!(table.record_failure("shop/checkout"), (secs(5), 2));
        assert_eq!(table.record_failure("shop/checkout"), (secs(10), 3));
        assert_eq!(table.record_failure("shop/cart"), (secs(5), 1));

        table.reset("shop/checkout");
        assert_eq!(table.error_count("shop/checkout"), 0);
        assert_eq!(table.error_count("shop/cart"), 1);
        assert_eq!(table.record_failure("shop/checkout"), (secs(5), 1));
    }
}
