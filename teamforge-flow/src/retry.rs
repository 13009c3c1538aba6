//! ABOUTME: Retry delay computation for the backoff curves a step's retry config may declare

use teamforge_core::model::{Backoff, RetryConfig};

/// Compute the delay before retry attempt `attempt` (1-indexed: the delay that
/// precedes attempt 2, 3, ...). Returns `None` when `cfg` is absent or its
/// base `delay` is zero, meaning no sleep should occur.
pub fn retry_delay(cfg: Option<&RetryConfig>, attempt: u32) -> Option<std::time::Duration> {
    let cfg = cfg?;
    if cfg.delay == 0 {
        return None;
    }
    let base = cfg.delay as f64;
    let raw = match cfg.backoff {
        Backoff::Fixed => base,
        Backoff::Linear => base * attempt as f64,
        Backoff::Exponential => base * 2f64.powi(attempt as i32 - 1),
    };
    let capped = raw.min(cfg.max_delay as f64).max(0.0);
    Some(std::time::Duration::from_secs_f64(capped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(backoff: Backoff, delay: u64, max_delay: u64) -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            delay,
            backoff,
            max_delay,
        }
    }

    #[test]
    fn fixed_is_constant() {
        let cfg = cfg(Backoff::Fixed, 2, 300);
        for attempt in 1..=4 {
            assert_eq!(retry_delay(Some(&cfg), attempt).unwrap().as_secs(), 2);
        }
    }

    #[test]
    fn linear_grows_by_attempt() {
        let cfg = cfg(Backoff::Linear, 1, 300);
        assert_eq!(retry_delay(Some(&cfg), 1).unwrap().as_secs(), 1);
        assert_eq!(retry_delay(Some(&cfg), 2).unwrap().as_secs(), 2);
        assert_eq!(retry_delay(Some(&cfg), 3).unwrap().as_secs(), 3);
    }

    #[test]
    fn exponential_doubles() {
        let cfg = cfg(Backoff::Exponential, 1, 8);
        assert_eq!(retry_delay(Some(&cfg), 2).unwrap().as_secs(), 2);
        assert_eq!(retry_delay(Some(&cfg), 3).unwrap().as_secs(), 4);
        assert_eq!(retry_delay(Some(&cfg), 4).unwrap().as_secs(), 8);
    }

    #[test]
    fn capped_at_max_delay() {
        let cfg = cfg(Backoff::Exponential, 1, 8);
        assert_eq!(retry_delay(Some(&cfg), 10).unwrap().as_secs(), 8);
    }

    #[test]
    fn zero_delay_means_no_sleep() {
        let cfg = cfg(Backoff::Fixed, 0, 300);
        assert!(retry_delay(Some(&cfg), 1).is_none());
    }

    #[test]
    fn absent_config_means_no_sleep() {
        assert!(retry_delay(None, 1).is_none());
    }

    #[test]
    fn monotonic_non_decreasing_for_linear_and_exponential() {
        for backoff in [Backoff::Linear, Backoff::Exponential] {
            let cfg = cfg(backoff, 1, 1000);
            let mut last = 0.0;
            for attempt in 1..=6 {
                let d = retry_delay(Some(&cfg), attempt).unwrap().as_secs_f64();
                assert!(d >= last);
                last = d;
            }
        }
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// `retry_delay` is constant in `attempt` for `fixed`, monotonic
        /// non-decreasing in `attempt` for `linear`/`exponential`, and never
        /// exceeds `max_delay`, for arbitrary delay/max_delay/attempt inputs.
        #[test]
        fn retry_delay_is_monotonic_and_capped(
            delay in 1u64..500,
            max_delay in 1u64..1000,
            attempt in 2u32..20,
            backoff_idx in 0u8..3,
        ) {
            let backoff = match backoff_idx {
                0 => Backoff::Fixed,
                1 => Backoff::Linear,
                _ => Backoff::Exponential,
            };
            let cfg = RetryConfig {
                max_attempts: 20,
                delay,
                backoff,
                max_delay,
            };

            let d_this = retry_delay(Some(&cfg), attempt).unwrap().as_secs_f64();
            let d_prev = retry_delay(Some(&cfg), attempt - 1).unwrap().as_secs_f64();

            prop_assert!(d_this <= max_delay as f64 + 1e-9);
            prop_assert!(d_prev <= max_delay as f64 + 1e-9);

            match backoff {
                Backoff::Fixed => prop_assert!((d_this - d_prev).abs() < 1e-9),
                Backoff::Linear | Backoff::Exponential => prop_assert!(d_this >= d_prev - 1e-9),
            }
        }
    }
}
