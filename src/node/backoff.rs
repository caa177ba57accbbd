use std::time::Duration;

use rand::Rng;

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_MAX_EXPONENT: u32 = 5;
const BACKOFF_JITTER_MS: u64 = 250;

/// Reconnect delay for the node websocket: doubles up to 32s, plus jitter.
pub(super) struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub(super) fn new() -> Self {
        Self { attempt: 0 }
    }

    pub(super) fn next(&mut self) -> Duration {
        let exponent = self.attempt.min(BACKOFF_MAX_EXPONENT);
        self.attempt = self.attempt.saturating_add(1);
        let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
        Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(exponent) + jitter)
    }

    pub(super) fn attempts(&self) -> u32 {
        self.attempt
    }

    pub(super) fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next().as_millis() as u64).collect();

        assert!((1_000..1_250).contains(&delays[0]));
        assert!((2_000..2_250).contains(&delays[1]));
        assert!((4_000..4_250).contains(&delays[2]));
        assert!((32_000..32_250).contains(&delays[7]));
        assert_eq!(backoff.attempts(), 8);

        backoff.reset();
        assert!(backoff.next() < Duration::from_millis(1_250));
    }
}
