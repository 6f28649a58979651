//! Reconnect backoff schedule

use rand::Rng;
use std::time::Duration;

const BASE_DELAY_MS: u64 = 30_000;
const MAX_DELAY_MS: u64 = 300_000;
const JITTER_MS: u64 = 5_000;

/// Base delay for the given attempt number (0-based), before jitter
pub(crate) fn base_delay_ms(attempt: u32) -> u64 {
    let delay = BASE_DELAY_MS as f64 * 1.5f64.powi(attempt as i32);
    delay.min(MAX_DELAY_MS as f64) as u64
}

/// Full reconnect delay for the given attempt number, with random jitter
pub fn reconnect_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    Duration::from_millis(base_delay_ms(attempt) + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_schedule() {
        assert_eq!(base_delay_ms(0), 30_000);
        assert_eq!(base_delay_ms(1), 45_000);
        assert_eq!(base_delay_ms(2), 67_500);
        assert_eq!(base_delay_ms(3), 101_250);
    }

    #[test]
    fn test_base_delay_caps_at_five_minutes() {
        assert_eq!(base_delay_ms(6), 300_000);
        assert_eq!(base_delay_ms(50), 300_000);
    }

    #[test]
    fn test_jitter_bounds() {
        for attempt in [0, 3, 10] {
            let base = base_delay_ms(attempt);
            for _ in 0..100 {
                let delay = reconnect_delay(attempt).as_millis() as u64;
                assert!(delay >= base);
                assert!(delay < base + JITTER_MS);
            }
        }
    }
}
