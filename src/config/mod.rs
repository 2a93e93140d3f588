//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → owned by the Shield, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a Shield is built; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, CollaboratorConfig, ContentConfig, FailAction,
    IpReputationConfig, ListenerConfig, LogFormat, MaintenanceConfig, ObservabilityConfig,
    RateLimitConfig, ResponseConfig, ShieldConfig, TrafficAnalysisConfig,
};
pub use validation::{validate_config, ValidationError};
