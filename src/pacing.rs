use rand::Rng;
use std::time::Duration;

/// Uniformly random duration in `[min_ms, max_ms]` milliseconds.
pub fn random_millis(min_ms: u64, max_ms: u64) -> Duration {
    Duration::from_millis(random_inclusive(min_ms, max_ms))
}

/// Uniformly random whole number of minutes in `[min, max]`.
pub fn random_minutes(min: u64, max: u64) -> Duration {
    Duration::from_secs(random_inclusive(min, max) * 60)
}

fn random_inclusive(min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    rand::rng().random_range(min..=max)
}
