//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ShieldConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ShieldConfig, ConfigError> {
    let config: ShieldConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ShieldConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Example configuration printed by `--print-config`.
pub fn example_config() -> &'static str {
    r#"[listener]
bind_address = "0.0.0.0:8080"

[rate_limit]
window_ms = 60000
max_requests = 100
skip_successful_requests = false
max_tracked_keys = 100000

[ip_reputation]
blacklist_ttl_ms = 3600000
suspicious_threshold = 50
block_threshold = 20
auto_blacklist_threshold = 10
auto_blacklist_enabled = true
cache_capacity = 100000

[traffic_analysis]
enable_behavior_analysis = true
anomaly_threshold = 3
sample_rate = 0.1

[response]
enable_tarpit = true
tarpit_delay_ms = 5000
enable_captcha = true
enable_geo_blocking = false
allowed_countries = ["DE", "FR", "IT", "ES", "NL", "BE", "AT", "CH"]
geo_fail_action = "allow"

[content]
max_content_length = 10485760

[circuit_breaker]
failure_threshold = 5
open_timeout_ms = 60000

[collaborators]
# reputation_url = "http://reputation.internal/v1/ip/{ip}"
# geoip_url = "http://geoip.internal/v1/country/{ip}"
timeout_ms = 500

[admin]
enabled = true
api_key = "CHANGE_ME_IN_PRODUCTION"

[observability]
log_level = "info"
log_format = "pretty"
metrics_enabled = true
metrics_address = "0.0.0.0:9090"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(example_config()).unwrap();
        assert!(config.admin.enabled);
        assert_eq!(config.collaborators.timeout_ms, 500);
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[rate_limit]\nwindow_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("rate_limit.window_ms"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
