//! Reconnect delays for the event stream transport.

use rand::Rng;
use std::time::Duration;

/// Configuration for reconnect backoff.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnect attempt.
    pub initial: Duration,
    /// Upper bound for the base delay.
    pub max: Duration,
    /// Factor applied to the base delay after every failed attempt.
    pub multiplier: u32,
    /// Whether to randomise delays (equal jitter: half fixed, half random).
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            multiplier: 2,
            jitter: true,
        }
    }
}

/// Exponential backoff state for one connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `config.initial`.
    pub fn new(config: BackoffConfig) -> Self {
        let current = config.initial.min(config.max);
        Self { config, current }
    }

    /// Returns the delay to wait before the next attempt and grows the base.
    ///
    /// Without jitter the delays are `initial`, `initial * m`, ... capped at
    /// `max`. With jitter each delay lies in `[base / 2, base]`.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = base
            .saturating_mul(self.config.multiplier.max(1))
            .min(self.config.max);

        if !self.config.jitter {
            return base;
        }
        let half = u64::try_from(base.as_millis() / 2).unwrap_or(u64::MAX / 2);
        let spread = rand::thread_rng().gen_range(0..=half);
        Duration::from_millis(half + spread)
    }

    /// Returns to the initial delay after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.config.initial.min(self.config.max);
    }

    /// Replaces the initial delay with the server's `retry:` hint.
    pub fn set_initial(&mut self, initial: Duration) {
        self.config.initial = initial;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(initial_ms: u64, max_ms: u64) -> BackoffConfig {
        BackoffConfig {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(max_ms),
            multiplier: 2,
            jitter: false,
        }
    }

    #[test]
    fn doubles_up_to_max() {
        let mut backoff = Backoff::new(fixed(100, 500));
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut backoff = Backoff::new(fixed(100, 10_000));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn jittered_delay_stays_within_half_and_full_base() {
        let mut config = fixed(1000, 1000);
        config.jitter = true;
        let mut backoff = Backoff::new(config);
        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(500), "{delay:?}");
            assert!(delay <= Duration::from_millis(1000), "{delay:?}");
        }
    }

    #[test]
    fn server_retry_hint_replaces_initial() {
        let mut backoff = Backoff::new(fixed(100, 10_000));
        backoff.next_delay();
        backoff.set_initial(Duration::from_millis(3000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(3000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(6000));
    }
}
