//! Delays between retry attempts.

use rand::Rng;
use std::time::Duration;

/// Delay sequence for one retried operation.
///
/// Starts at `base_ms` and doubles per retry, never above `max_ms`. Each delay
/// is shortened by up to a tenth at random so callers that failed together do
/// not come back together.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            next_ms: base_ms.min(max_ms),
            max_ms,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.next_ms;
        self.next_ms = ceiling.saturating_mul(2).min(self.max_ms);

        let spread = ceiling / 10;
        let cut = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        Duration::from_millis(ceiling - cut)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
