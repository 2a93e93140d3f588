//! Linear retry backoff.

use std::time::Duration;

/// Delay before retrying after failed attempt number `attempt` (1-based).
pub fn linear(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let base = Duration::from_millis(250);
        assert_eq!(linear(base, 0), Duration::ZERO);
        assert_eq!(linear(base, 1), Duration::from_millis(250));
        assert_eq!(linear(base, 4), Duration::from_secs(1));
        assert_eq!(linear(Duration::MAX, 2), Duration::MAX);
    }
}
