//! Randomized pacing.
//!
//! Fixed intervals line up request bursts across workers and get throttled,
//! so every wait and scroll step in the pipeline is drawn from a range.

use std::time::Duration;

use mapscout_core::RandomRange;
use rand::Rng;

/// Draws a value uniformly from the inclusive range.
pub(crate) fn sample(range: RandomRange) -> u64 {
    if range.min >= range.max {
        return range.min;
    }
    rand::rng().random_range(range.min..=range.max)
}

/// Sleeps for a random number of milliseconds drawn from `range_ms`.
pub(crate) async fn pause(range_ms: RandomRange) {
    let delay_ms = sample(range_ms);
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
