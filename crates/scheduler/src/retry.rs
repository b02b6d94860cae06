use std::time::Duration;

/// Exponential backoff for a job's next attempt: `base * 2^(attempts - 1)`.
/// `attempts` is the number of attempts made so far, including the one that
/// just failed, so the first retry waits one `base` interval.
pub const fn backoff_delay(attempts: u32, base_ms: u64) -> Duration {
    let uncapped = attempts.saturating_sub(1);
    let exponent = if uncapped > 16 { 16 } else { uncapped };
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_retry_waits_one_base_interval() {
        assert_eq!(backoff_delay(1, 2_000), Duration::from_millis(2_000));
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        assert_eq!(backoff_delay(2, 2_000), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(3, 2_000), Duration::from_millis(8_000));
    }

    #[test]
    fn never_panics_on_large_attempt_counts() {
        let _ = backoff_delay(1_000, 2_000);
    }
}
