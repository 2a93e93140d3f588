//! Timeout enforcement.
//!
//! Every call that leaves the process goes through [`bounded`]. Timeouts
//! surface as the caller's own error type so they can be told apart from
//! other failures without a wrapper.

use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;

/// Run `fut` with a deadline.
pub async fn bounded<F, T, E>(deadline: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(elapsed) => Err(E::from(elapsed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Timeout,
        Failed,
    }

    impl From<Elapsed> for TestError {
        fn from(_: Elapsed) -> Self {
            TestError::Timeout
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_hit() {
        let result: Result<(), TestError> = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(TestError::Timeout));
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok: Result<u8, TestError> = bounded(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let failed: Result<u8, TestError> =
            bounded(Duration::from_secs(1), async { Err(TestError::Failed) }).await;
        assert_eq!(failed, Err(TestError::Failed));
    }
}
