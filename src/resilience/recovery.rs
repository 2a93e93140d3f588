//! What a protected call does once its attempts are used up.

use std::fmt;
use std::time::Duration;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Value returned in place of a failed operation.
pub enum Fallback<T> {
    Value(T),
    With(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Fallback<T> {
    pub fn resolve(self) -> T {
        match self {
            Fallback::Value(value) => value,
            Fallback::With(produce) => produce(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Fallback::With(_) => f.write_str("With(<closure>)"),
        }
    }
}

/// Terminal strategy after the last failed attempt.
pub enum Recovery<T> {
    /// Surface the last operation error.
    Retry,
    Fallback(Fallback<T>),
    /// Serve the last good result for the key, else a simplified value.
    GracefulDegradation(Box<dyn FnOnce() -> T + Send>),
    /// Open the breaker for the key.
    CircuitBreaker,
}

impl<T> Recovery<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Recovery::Retry => "retry",
            Recovery::Fallback(_) => "fallback",
            Recovery::GracefulDegradation(_) => "graceful_degradation",
            Recovery::CircuitBreaker => "circuit_breaker",
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Recovery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::Fallback(fallback) => f.debug_tuple("Fallback").field(fallback).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Retry budget plus terminal strategy for one protected call.
#[derive(Debug)]
pub struct RecoveryPolicy<T> {
    /// Attempts before the strategy applies; at least one always runs.
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number.
    pub retry_delay: Duration,
    pub recovery: Recovery<T>,
}

impl<T> RecoveryPolicy<T> {
    pub fn new(max_retries: u32, recovery: Recovery<T>) -> Self {
        Self {
            max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
            recovery,
        }
    }

    pub fn retry(max_retries: u32) -> Self {
        Self::new(max_retries, Recovery::Retry)
    }

    pub fn fallback(max_retries: u32, value: T) -> Self {
        Self::new(max_retries, Recovery::Fallback(Fallback::Value(value)))
    }

    pub fn fallback_with(max_retries: u32, produce: impl FnOnce() -> T + Send + 'static) -> Self {
        Self::new(max_retries, Recovery::Fallback(Fallback::With(Box::new(produce))))
    }

    pub fn degrade(max_retries: u32, simplified: impl FnOnce() -> T + Send + 'static) -> Self {
        Self::new(max_retries, Recovery::GracefulDegradation(Box::new(simplified)))
    }

    pub fn circuit_breaker(max_retries: u32) -> Self {
        Self::new(max_retries, Recovery::CircuitBreaker)
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Attempts that will actually run.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}
