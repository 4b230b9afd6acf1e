//! Usage: Capped exponential backoff between retry attempts.

use rand::Rng;
use std::time::Duration;

const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)` plus up to `base/2`
/// of jitter, never above `cap`.
pub fn retry_backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;
    let cap_ms = cap.as_millis().min(u128::from(u64::MAX)) as u64;
    if base_ms == 0 || cap_ms == 0 {
        return Duration::ZERO;
    }

    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let exponential_ms = base_ms.saturating_mul(1u64 << exponent);
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms / 2);

    Duration::from_millis(exponential_ms.saturating_add(jitter_ms).min(cap_ms))
}
