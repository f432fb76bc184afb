//! Linear backoff utilities for retry operations.

use std::time::Duration;

/// Delays for linear backoff: `base`, `2 * base`, `3 * base`, ...
///
/// Feed it to [`tokio_retry::Retry::start`] together with `.take(n)` to bound
/// the number of retries.
pub fn linear_backoff(base: Duration) -> impl Iterator<Item = Duration> {
    (1u32..).map(move |attempt| base.saturating_mul(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_grows_by_base() {
        let delays: Vec<Duration> = linear_backoff(Duration::from_secs(5)).take(3).collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(5), Duration::from_secs(10), Duration::from_secs(15)]
        );
    }

    #[test]
    fn test_linear_backoff_zero_base() {
        assert!(linear_backoff(Duration::ZERO).take(4).all(|d| d.is_zero()));
    }
}
