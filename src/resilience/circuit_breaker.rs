//! Per-key circuit breakers around arbitrary async operations.
//!
//! # States
//! - Closed: calls run normally
//! - Open: calls fail fast without running
//! - Half-Open: one probe call decides whether to close again
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold, or a CircuitBreaker
//!                recovery strategy runs out of attempts
//! Open → Half-Open: open_timeout elapsed since the last failure
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - Breakers are created lazily per key and dropped after `idle_ttl` idle,
//!   unless still open and inside `open_timeout`
//! - Only one probe runs in Half-Open; a dropped probe releases its slot
//! - State is never locked across an await

use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::backoff;
use crate::resilience::recovery::{Recovery, RecoveryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Errors from [`CircuitBreakerRegistry::protect`].
#[derive(Debug, Error)]
pub enum ProtectError<E> {
    /// The breaker is open; the operation was not run.
    #[error("circuit '{key}' is open")]
    Unavailable { key: String },

    /// The operation kept failing and the breaker was opened.
    #[error("circuit '{key}' opened after {attempts} failed attempts")]
    CircuitOpened { key: String, attempts: u32 },

    #[error("operation failed: {0}")]
    Operation(E),
}

impl<E> ProtectError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(
            self,
            ProtectError::Unavailable { .. } | ProtectError::CircuitOpened { .. }
        )
    }
}

struct Breaker {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
    last_activity: Instant,
    last_good: Option<Arc<dyn Any + Send + Sync>>,
}

impl Breaker {
    fn new(now: Instant) -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            last_failure: None,
            probe_in_flight: false,
            last_activity: now,
            last_good: None,
        }
    }

    fn cooled_down(&self, now: Instant, open_timeout: Duration) -> bool {
        self.last_failure
            .map_or(true, |at| now.duration_since(at) > open_timeout)
    }
}

enum Admission {
    Normal,
    Probe,
    Rejected,
}

/// Releases the half-open probe slot if the probe never reports back.
struct ProbeGuard<'a> {
    breakers: &'a DashMap<String, Breaker>,
    key: &'a str,
    armed: bool,
}

impl ProbeGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(mut breaker) = self.breakers.get_mut(self.key) {
                breaker.probe_in_flight = false;
            }
        }
    }
}

pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Breaker>,
    failure_threshold: u32,
    open_timeout: Duration,
    idle_ttl: Duration,
}

impl CircuitBreakerRegistry {
    pub fn new(failure_threshold: u32, open_timeout: Duration, idle_ttl: Duration) -> Self {
        Self {
            breakers: DashMap::new(),
            failure_threshold: failure_threshold.max(1),
            open_timeout,
            idle_ttl,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.open_timeout(), config.idle_ttl())
    }

    /// Run `operation` under the breaker for `key`.
    ///
    /// `operation` is called once per attempt. Failed attempts are spaced by
    /// `retry_delay × attempt`; once they run out, or the breaker opens,
    /// `policy.recovery` decides the result.
    pub async fn protect<T, E, F, Fut>(
        &self,
        key: &str,
        policy: RecoveryPolicy<T>,
        mut operation: F,
    ) -> Result<T, ProtectError<E>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = match self.admit(key) {
            Admission::Rejected => {
                debug!(key, "Circuit open, call rejected");
                return Err(ProtectError::Unavailable { key: key.to_string() });
            }
            Admission::Probe => ProbeGuard {
                breakers: &self.breakers,
                key,
                armed: true,
            },
            Admission::Normal => ProbeGuard {
                breakers: &self.breakers,
                key,
                armed: false,
            },
        };

        let max_attempts = policy.attempts();
        let mut attempts = 0;
        let error = loop {
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    self.record_success(key, value.clone());
                    guard.disarm();
                    return Ok(value);
                }
                Err(e) => {
                    let opened = self.record_failure(key);
                    guard.disarm();
                    if opened || attempts >= max_attempts {
                        break e;
                    }
                }
            }
            tokio::time::sleep(backoff::linear(policy.retry_delay, attempts)).await;
        };

        warn!(key, attempts, strategy = policy.recovery.name(), "Protected operation failed");
        match policy.recovery {
            Recovery::Retry => Err(ProtectError::Operation(error)),
            Recovery::Fallback(fallback) => Ok(fallback.resolve()),
            Recovery::GracefulDegradation(simplified) => {
                Ok(self.last_good::<T>(key).unwrap_or_else(simplified))
            }
            Recovery::CircuitBreaker => {
                self.trip(key);
                Err(ProtectError::CircuitOpened {
                    key: key.to_string(),
                    attempts,
                })
            }
        }
    }

    fn admit(&self, key: &str) -> Admission {
        let now = Instant::now();
        let mut breaker = self
            .breakers
            .entry(key.to_string())
            .or_insert_with(|| Breaker::new(now));
        breaker.last_activity = now;

        match breaker.state {
            BreakerState::Closed => Admission::Normal,
            BreakerState::Open if !breaker.cooled_down(now, self.open_timeout) => Admission::Rejected,
            BreakerState::Open | BreakerState::HalfOpen => {
                if breaker.probe_in_flight {
                    return Admission::Rejected;
                }
                breaker.state = BreakerState::HalfOpen;
                breaker.probe_in_flight = true;
                debug!(key, "Circuit half-open, probing");
                Admission::Probe
            }
        }
    }

    fn record_success<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        if let Some(mut breaker) = self.breakers.get_mut(key) {
            if breaker.state != BreakerState::Closed {
                info!(key, "Circuit closed");
            }
            breaker.state = BreakerState::Closed;
            breaker.failure_count = 0;
            breaker.probe_in_flight = false;
            breaker.last_activity = Instant::now();
            breaker.last_good = Some(Arc::new(value));
        }
    }

    /// Count a failure; true when the breaker is now open.
    fn record_failure(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut breaker = self
            .breakers
            .entry(key.to_string())
            .or_insert_with(|| Breaker::new(now));

        breaker.failure_count = breaker.failure_count.saturating_add(1);
        breaker.last_failure = Some(now);
        breaker.last_activity = now;

        let was_probe = breaker.probe_in_flight;
        breaker.probe_in_flight = false;

        if breaker.state == BreakerState::Open {
            return true;
        }
        if was_probe || breaker.failure_count >= self.failure_threshold {
            breaker.state = BreakerState::Open;
            warn!(key, failures = breaker.failure_count, "Circuit opened");
            metrics::record_circuit_open(key);
            return true;
        }
        false
    }

    fn trip(&self, key: &str) {
        let now = Instant::now();
        let mut breaker = self
            .breakers
            .entry(key.to_string())
            .or_insert_with(|| Breaker::new(now));
        if breaker.state != BreakerState::Open {
            warn!(key, failures = breaker.failure_count, "Circuit opened by recovery strategy");
            metrics::record_circuit_open(key);
        }
        breaker.state = BreakerState::Open;
        breaker.last_failure = Some(now);
        breaker.probe_in_flight = false;
    }

    fn last_good<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let breaker = self.breakers.get(key)?;
        let value: &(dyn Any + Send + Sync) = breaker.last_good.as_deref()?;
        value.downcast_ref::<T>().cloned()
    }

    /// Consecutive failures recorded for `key`.
    pub fn failure_count(&self, key: &str) -> u32 {
        self.breakers.get(key).map_or(0, |b| b.failure_count)
    }

    /// Current state for `key`; an open breaker past its timeout reports Half-Open.
    pub fn state(&self, key: &str) -> BreakerState {
        let Some(breaker) = self.breakers.get(key) else {
            return BreakerState::Closed;
        };
        match breaker.state {
            BreakerState::Open if breaker.cooled_down(Instant::now(), self.open_timeout) => {
                BreakerState::HalfOpen
            }
            state => state,
        }
    }

    /// Force `key` closed. Returns false if the key was unknown.
    pub fn reset(&self, key: &str) -> bool {
        match self.breakers.get_mut(key) {
            Some(mut breaker) => {
                breaker.state = BreakerState::Closed;
                breaker.failure_count = 0;
                breaker.last_failure = None;
                breaker.probe_in_flight = false;
                true
            }
            None => false,
        }
    }

    /// Drop breakers idle for longer than `idle_ttl`.
    ///
    /// An open breaker survives until its `open_timeout` has elapsed, and a
    /// half-open breaker with its trial call still running is always kept.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.breakers.len();
        self.breakers.retain(|_, breaker| {
            breaker.probe_in_flight
                || now.duration_since(breaker.last_activity) < self.idle_ttl
                || (breaker.state != BreakerState::Closed
                    && !breaker.cooled_down(now, self.open_timeout))
        });
        before.saturating_sub(self.breakers.len())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}
