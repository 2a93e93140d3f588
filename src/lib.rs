//! Request admission control and DDoS mitigation.
//!
//! A [`Shield`] runs every inbound request through an ordered pipeline
//! (allow/deny lists, rate limiting, adaptive IP reputation, behavior
//! heuristics, geo policy, content inspection) and answers allow, block,
//! tarpit or CAPTCHA. A per-key circuit breaker registry protects calls to
//! unreliable downstream operations.

pub mod admin;
pub mod collaborators;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod shield;

pub use config::schema::ShieldConfig;
pub use http::{shield_middleware, HttpServer};
pub use lifecycle::Shutdown;
pub use shield::{Action, Decision, Shield, ShieldRequest, ShieldStatus};
