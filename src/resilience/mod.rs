//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an unreliable operation:
//!     → circuit_breaker.rs (reject fast while open, else run)
//!     → On failure: backoff.rs (linear spacing between attempts)
//!     → On exhaustion: recovery.rs (retry error, fallback, degrade, or trip)
//!
//! Call to a collaborator:
//!     → timeouts.rs (every external call has a deadline)
//! ```
//!
//! # Design Decisions
//! - Breakers are keyed by operation name, not global
//! - Recovery strategies are a closed enum chosen per call
//! - Timeouts are non-negotiable for anything leaving the process

pub mod backoff;
pub mod circuit_breaker;
pub mod recovery;
pub mod timeouts;

pub use circuit_breaker::{BreakerState, CircuitBreakerRegistry, ProtectError};
pub use recovery::{Fallback, Recovery, RecoveryPolicy};
