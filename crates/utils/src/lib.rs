use rand::Rng;

/// Exponential backoff delay in millis for the given retry attempt, with
/// random jitter of up to `base_millis` added so that concurrent retry loops
/// do not hammer the provider in lockstep. The delay is capped at
/// `cap_millis` before jitter is applied.
pub fn backoff_with_jitter(attempt: u32, base_millis: u64, cap_millis: u64) -> u64 {
    let exp = base_millis.saturating_mul(1_u64 << attempt.min(16));
    let delay = exp.min(cap_millis);
    if base_millis == 0 {
        return delay;
    }
    let mut rng = rand::thread_rng();
    delay + rng.gen_range(0..base_millis)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert!(backoff_with_jitter(0, 500, 10_000) >= 500);
        assert!(backoff_with_jitter(1, 500, 10_000) >= 1000);
        assert!(backoff_with_jitter(2, 500, 10_000) >= 2000);
    }

    #[test]
    fn backoff_is_capped() {
        for attempt in 0..40 {
            assert!(backoff_with_jitter(attempt, 500, 3000) <= 3500);
        }
    }

    #[test]
    fn zero_base_means_no_delay_and_no_jitter() {
        assert_eq!(backoff_with_jitter(5, 0, 3000), 0);
    }
}
