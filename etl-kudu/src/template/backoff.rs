use std::time::Duration;

use etl_config::shared::WriteRetryConfig;
use rand::Rng;

/// Largest random extension added to a delay, as a fraction of it.
const MAX_JITTER_FACTOR: f64 = 0.3;

/// Delay before retry attempt `attempt` (1-based).
///
/// `initial_retry_delay_ms * backoff_multiplier^(attempt - 1)`, capped at
/// `max_retry_delay_ms`, plus up to 30% jitter. A zero initial delay disables sleeping.
pub fn calculate_backoff(config: &WriteRetryConfig, attempt: u32) -> Duration {
    if config.initial_retry_delay_ms == 0 {
        return Duration::ZERO;
    }

    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base_delay_ms =
        config.initial_retry_delay_ms as f64 * config.backoff_multiplier.powi(exponent);
    let capped_delay_ms = base_delay_ms.min(config.max_retry_delay_ms as f64);

    let jitter_factor = rand::rng().random::<f64>() * MAX_JITTER_FACTOR;
    let jittered_delay_ms = capped_delay_ms * (1.0 + jitter_factor);

    Duration::from_millis(jittered_delay_ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within_jitter(delay: Duration, base_ms: u64) {
        let millis = delay.as_millis() as u64;
        assert!(millis >= base_ms, "{millis} < {base_ms}");
        assert!(
            millis as f64 <= base_ms as f64 * (1.0 + MAX_JITTER_FACTOR),
            "{millis} exceeds jitter bound for {base_ms}"
        );
    }

    #[test]
    fn grows_exponentially_until_capped() {
        let config = WriteRetryConfig::default();

        assert_within_jitter(calculate_backoff(&config, 1), 100);
        assert_within_jitter(calculate_backoff(&config, 2), 200);
        assert_within_jitter(calculate_backoff(&config, 4), 800);
        assert_within_jitter(calculate_backoff(&config, 20), 5_000);
    }

    #[test]
    fn zero_delay_disables_sleeping() {
        let config = WriteRetryConfig::default().without_delay();

        assert_eq!(calculate_backoff(&config, 1), Duration::ZERO);
        assert_eq!(calculate_backoff(&config, 30), Duration::ZERO);
    }
}
