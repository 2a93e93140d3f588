//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shield.
//! All types derive Serde traits for deserialization from config files.
//! Keys are snake_case; the camelCase names used by the original dashboard
//! configuration are accepted as aliases.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the request shield.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Listener configuration for the decision service.
    pub listener: ListenerConfig,

    /// Fixed-window rate limiting.
    #[serde(alias = "rateLimit")]
    pub rate_limit: RateLimitConfig,

    /// Reputation thresholds and cache sizing.
    #[serde(alias = "ipReputation")]
    pub ip_reputation: IpReputationConfig,

    /// Behavioral analysis and metrics sampling.
    #[serde(alias = "trafficAnalysis")]
    pub traffic_analysis: TrafficAnalysisConfig,

    /// Response strategies (tarpit, captcha, geo-blocking).
    pub response: ResponseConfig,

    /// Content inspection limits.
    pub content: ContentConfig,

    /// Circuit breaker defaults.
    #[serde(alias = "circuitBreaker")]
    pub circuit_breaker: CircuitBreakerConfig,

    /// External lookup collaborators.
    pub collaborators: CollaboratorConfig,

    /// Background maintenance cadence.
    pub maintenance: MaintenanceConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout for the decision service in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    #[serde(alias = "windowMs")]
    pub window_ms: u64,

    /// Requests admitted per key and window.
    #[serde(alias = "maxRequests")]
    pub max_requests: u32,

    /// Refund the token of requests that pass the whole pipeline.
    #[serde(alias = "skipSuccessfulRequests")]
    pub skip_successful_requests: bool,

    /// Most client windows held at once; the least recently seen are evicted.
    #[serde(alias = "maxTrackedKeys")]
    pub max_tracked_keys: usize,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 100,
            skip_successful_requests: false,
            max_tracked_keys: 100_000,
        }
    }
}

/// IP reputation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpReputationConfig {
    /// How long a reputation entry (and therefore a bad score) is remembered.
    #[serde(alias = "blacklistTTL", alias = "blacklistTtl")]
    pub blacklist_ttl_ms: u64,

    /// Scores below this require a CAPTCHA (when enabled).
    #[serde(alias = "suspiciousThreshold")]
    pub suspicious_threshold: u8,

    /// Scores below this are blocked outright.
    #[serde(alias = "blockThreshold")]
    pub block_threshold: u8,

    /// Scores below this move the IP into the blacklist.
    #[serde(alias = "autoBlacklistThreshold")]
    pub auto_blacklist_threshold: u8,

    /// Enable automatic blacklisting.
    #[serde(alias = "autoBlacklistEnabled")]
    pub auto_blacklist_enabled: bool,

    /// Maximum number of tracked IPs.
    #[serde(alias = "cacheCapacity")]
    pub cache_capacity: usize,
}

impl IpReputationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.blacklist_ttl_ms)
    }
}

impl Default for IpReputationConfig {
    fn default() -> Self {
        Self {
            blacklist_ttl_ms: 3_600_000,
            suspicious_threshold: 50,
            block_threshold: 20,
            auto_blacklist_threshold: 10,
            auto_blacklist_enabled: true,
            cache_capacity: 100_000,
        }
    }
}

/// Traffic analysis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficAnalysisConfig {
    /// Run the behavioral heuristics stage.
    #[serde(alias = "enableBehaviorAnalysis")]
    pub enable_behavior_analysis: bool,

    /// Number of suspicious indicators that triggers a block.
    #[serde(alias = "anomalyThreshold")]
    pub anomaly_threshold: usize,

    /// Fraction of allowed requests sampled into top user agents / paths.
    #[serde(alias = "sampleRate")]
    pub sample_rate: f64,
}

impl Default for TrafficAnalysisConfig {
    fn default() -> Self {
        Self {
            enable_behavior_analysis: true,
            anomaly_threshold: 3,
            sample_rate: 0.1,
        }
    }
}

/// Action taken when an external lookup fails.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailAction {
    /// Let the request continue (fail-open).
    #[default]
    Allow,
    /// Deny the request (fail-closed).
    Block,
}

/// Response strategy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Delay rate-limited clients instead of rejecting immediately.
    #[serde(alias = "enableTarpit")]
    pub enable_tarpit: bool,

    /// Tarpit delay in milliseconds.
    #[serde(alias = "tarpitDelay", alias = "tarpitDelayMs")]
    pub tarpit_delay_ms: u64,

    /// Challenge suspicious clients with a CAPTCHA.
    #[serde(alias = "enableCaptcha")]
    pub enable_captcha: bool,

    /// Restrict traffic to `allowed_countries`.
    #[serde(alias = "enableGeoBlocking")]
    pub enable_geo_blocking: bool,

    /// ISO country codes allowed when geo-blocking is enabled.
    #[serde(alias = "allowedCountries")]
    pub allowed_countries: Vec<String>,

    /// What to do when the country cannot be resolved.
    #[serde(alias = "geoFailAction")]
    pub geo_fail_action: FailAction,
}

impl ResponseConfig {
    pub fn tarpit_delay(&self) -> Duration {
        Duration::from_millis(self.tarpit_delay_ms)
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            enable_tarpit: true,
            tarpit_delay_ms: 5_000,
            enable_captcha: true,
            enable_geo_blocking: false,
            allowed_countries: ["DE", "FR", "IT", "ES", "NL", "BE", "AT", "CH"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            geo_fail_action: FailAction::Allow,
        }
    }
}

/// Content inspection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Largest accepted declared body size in bytes.
    #[serde(alias = "maxContentLength")]
    pub max_content_length: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_content_length: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a breaker.
    #[serde(alias = "failureThreshold")]
    pub failure_threshold: u32,

    /// How long an open breaker rejects calls before probing, in milliseconds.
    #[serde(alias = "openTimeoutMs")]
    pub open_timeout_ms: u64,

    /// Closed, idle breakers are dropped after this many seconds.
    pub idle_ttl_secs: u64,
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout_ms: 60_000,
            idle_ttl_secs: 600,
        }
    }
}

/// External collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// JSON reputation endpoint; `{ip}` is substituted. Neutral scores when unset.
    pub reputation_url: Option<String>,

    /// JSON GeoIP endpoint; `{ip}` is substituted. No country when unset.
    pub geoip_url: Option<String>,

    /// Deadline for any single lookup in milliseconds.
    pub timeout_ms: u64,
}

impl CollaboratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            reputation_url: None,
            geoip_url: None,
            timeout_ms: 500,
        }
    }
}

/// Background maintenance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Metrics recomputation interval in milliseconds.
    pub metrics_interval_ms: u64,

    /// Idle state cleanup interval in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            metrics_interval_ms: 1_000,
            cleanup_interval_secs: 300,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
