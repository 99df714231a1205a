//! Random interval generation.
//!
//! Draws come from the operating system's CSPRNG (`OsRng`), so an observer
//! who has seen every past interval learns nothing about the next one. A
//! seeded or thread-local PRNG would not give that guarantee.

use chrono::Duration;
use rand::{rngs::OsRng, Rng};

use crate::error::{Result, SchedulerError};

/// Check interval bounds: both positive, min not above max.
pub fn validate_bounds(min_hours: u32, max_hours: u32) -> Result<()> {
    if min_hours == 0 || max_hours == 0 {
        return Err(SchedulerError::Config(
            "interval bounds must be positive".into(),
        ));
    }
    if min_hours > max_hours {
        return Err(SchedulerError::Config(format!(
            "min_interval_hours ({min_hours}) exceeds max_interval_hours ({max_hours})"
        )));
    }
    Ok(())
}

/// Draw a random duration in `[min_hours, max_hours]`, second resolution.
pub fn random_interval(min_hours: u32, max_hours: u32) -> Result<Duration> {
    validate_bounds(min_hours, max_hours)?;
    let min_secs = u64::from(min_hours) * 3600;
    let max_secs = u64::from(max_hours) * 3600;
    let secs = OsRng.gen_range(min_secs..=max_secs);
    Ok(Duration::seconds(secs as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_bounds() {
        let min = Duration::hours(24);
        let max = Duration::hours(90);
        for _ in 0..10_000 {
            let d = random_interval(24, 90).unwrap();
            assert!(d >= min && d <= max, "out of bounds: {d}");
        }
    }

    #[test]
    fn samples_spread_across_the_range() {
        // Coarse chi-square-style check: over 10k draws every quarter of the
        // range must be hit. A generator stuck in a narrow sub-range fails.
        let min_secs = 24 * 3600i64;
        let max_secs = 90 * 3600i64;
        let quarter = (max_secs - min_secs + 1) / 4;
        let mut buckets = [0u32; 4];
        for _ in 0..10_000 {
            let secs = random_interval(24, 90).unwrap().num_seconds();
            let idx = (((secs - min_secs) / quarter) as usize).min(3);
            buckets[idx] += 1;
        }
        for (i, count) in buckets.iter().enumerate() {
            assert!(*count > 0, "quarter {i} never sampled: {buckets:?}");
        }
    }

    #[test]
    fn equal_bounds_give_exact_duration() {
        let d = random_interval(48, 48).unwrap();
        assert_eq!(d, Duration::hours(48));
    }

    #[test]
    fn inverted_bounds_rejected() {
        assert!(matches!(
            random_interval(90, 24),
            Err(SchedulerError::Config(_))
        ));
    }

    #[test]
    fn zero_bound_rejected() {
        assert!(matches!(
            random_interval(0, 24),
            Err(SchedulerError::Config(_))
        ));
        assert!(matches!(
            random_interval(24, 0),
            Err(SchedulerError::Config(_))
        ));
    }
}
