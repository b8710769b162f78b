//! Redelivery delay with optional exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based; attempt 0 yields no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay before redelivery number `redelivery` (1-based).
pub fn redelivery_delay(redelivery: u32, base_ms: u64, max_ms: u64, exponential: bool) -> Duration {
    if exponential {
        calculate_backoff(redelivery, base_ms, max_ms)
    } else {
        Duration::from_millis(base_ms.min(max_ms))
    }
}
