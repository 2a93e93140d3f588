//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and combinations
//! that would leave the shield unable to make sensible decisions. All
//! problems are reported at once.

use thiserror::Error;

use crate::config::schema::ShieldConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be within 0..=100, got {value}")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    #[error("reputation thresholds must satisfy auto_blacklist <= block <= suspicious")]
    ThresholdOrder,

    #[error("traffic_analysis.sample_rate must be within 0.0..=1.0")]
    SampleRate,

    #[error("response.enable_geo_blocking requires at least one allowed country")]
    EmptyCountryList,

    #[error("{field} is not a valid address: {value}")]
    Address { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.window_ms" });
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_requests" });
    }
    if config.rate_limit.max_tracked_keys == 0 {
        errors.push(ValidationError::Zero { field: "rate_limit.max_tracked_keys" });
    }

    let rep = &config.ip_reputation;
    for (field, value) in [
        ("ip_reputation.suspicious_threshold", rep.suspicious_threshold),
        ("ip_reputation.block_threshold", rep.block_threshold),
        ("ip_reputation.auto_blacklist_threshold", rep.auto_blacklist_threshold),
    ] {
        if value > 100 {
            errors.push(ValidationError::ScoreOutOfRange { field, value });
        }
    }
    if !(rep.auto_blacklist_threshold <= rep.block_threshold
        && rep.block_threshold <= rep.suspicious_threshold)
    {
        errors.push(ValidationError::ThresholdOrder);
    }
    if rep.cache_capacity == 0 {
        errors.push(ValidationError::Zero { field: "ip_reputation.cache_capacity" });
    }
    if rep.blacklist_ttl_ms == 0 {
        errors.push(ValidationError::Zero { field: "ip_reputation.blacklist_ttl_ms" });
    }

    let rate = config.traffic_analysis.sample_rate;
    if !(0.0..=1.0).contains(&rate) {
        errors.push(ValidationError::SampleRate);
    }
    if config.traffic_analysis.anomaly_threshold == 0 {
        errors.push(ValidationError::Zero { field: "traffic_analysis.anomaly_threshold" });
    }

    if config.response.enable_geo_blocking && config.response.allowed_countries.is_empty() {
        errors.push(ValidationError::EmptyCountryList);
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::Zero { field: "circuit_breaker.failure_threshold" });
    }
    if config.collaborators.timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "collaborators.timeout_ms" });
    }
    if config.maintenance.metrics_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "maintenance.metrics_interval_ms" });
    }
    if config.maintenance.cleanup_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "maintenance.cleanup_interval_secs" });
    }

    for (field, value) in [
        ("listener.bind_address", &config.listener.bind_address),
        ("observability.metrics_address", &config.observability.metrics_address),
    ] {
        if value.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::Address { field, value: value.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
