//! The shield: owner of every cache, registry and analyzer.
//!
//! # Data Flow
//! ```text
//! ShieldRequest
//!     → gate.rs (validate: ordered stages, first terminal verdict wins)
//!     → Decision { allowed, reason, action, delay }
//!     → attack_metrics.rs (traffic counters, blocks per stage)
//!
//! Maintenance (lifecycle::maintenance):
//!     → tick_metrics() (rps, unique IPs, severity)
//!     → cleanup() (lapsed rate limiters, expired reputations, idle breakers)
//! ```
//!
//! # Design Decisions
//! - No globals: a `Shield` is built from a config and its collaborators
//!   and shared by `Arc`
//! - Config is immutable for the lifetime of a `Shield`
//! - The circuit breaker registry is exposed for callers protecting their
//!   own downstream operations

pub mod attack_metrics;
pub mod decision;
mod gate;
pub mod request;

use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::collaborators::{
    GeoLookup, HttpGeoLookup, HttpReputationFeed, LookupError, NeutralFeed, NoGeo, ReputationFeed,
};
use crate::config::ShieldConfig;
use crate::observability::metrics;
use crate::resilience::CircuitBreakerRegistry;
use crate::security::{
    AccessList, BehaviorAnalyzer, ContentInspector, GeoPolicy, IpReputation, RateLimiter,
    ReputationEvent, ReputationStore,
};

pub use attack_metrics::{AttackMetrics, MetricsAggregator, Severity};
pub use decision::{Action, Decision, Stage};
pub use request::ShieldRequest;

/// Point-in-time view for operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldStatus {
    pub enabled: bool,
    pub metrics: AttackMetrics,
    pub blacklisted_count: usize,
    pub whitelisted_count: usize,
    pub active_rate_limiters: usize,
    pub tracked_reputations: usize,
    pub circuit_breakers: usize,
}

/// Entries dropped by one [`Shield::cleanup`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub rate_limiters: usize,
    pub reputations: usize,
    pub breakers: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.rate_limiters + self.reputations + self.breakers
    }
}

pub struct Shield {
    config: ShieldConfig,
    access: AccessList,
    limiter: RateLimiter,
    reputation: ReputationStore,
    behavior: BehaviorAnalyzer,
    geo: GeoPolicy,
    content: ContentInspector,
    breakers: CircuitBreakerRegistry,
    metrics: MetricsAggregator,
}

impl Shield {
    /// Shield with neutral collaborators.
    pub fn new(config: ShieldConfig) -> Self {
        Self::with_collaborators(config, Arc::new(NeutralFeed), Arc::new(NoGeo))
    }

    pub fn with_collaborators(
        config: ShieldConfig,
        feed: Arc<dyn ReputationFeed>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let timeout = config.collaborators.timeout();
        Self {
            access: AccessList::new(),
            limiter: RateLimiter::from_config(&config.rate_limit),
            reputation: ReputationStore::new(&config.ip_reputation, feed, geo.clone(), timeout),
            behavior: BehaviorAnalyzer::new(),
            geo: GeoPolicy::new(&config.response, geo, timeout),
            content: ContentInspector::new(config.content.max_content_length),
            breakers: CircuitBreakerRegistry::from_config(&config.circuit_breaker),
            metrics: MetricsAggregator::new(config.traffic_analysis.sample_rate),
            config,
        }
    }

    /// Shield with HTTP collaborators for every configured URL.
    pub fn from_config(config: ShieldConfig) -> Result<Self, LookupError> {
        let collaborators = &config.collaborators;
        let feed: Arc<dyn ReputationFeed> = match &collaborators.reputation_url {
            Some(url) => Arc::new(HttpReputationFeed::new(url, collaborators.timeout())?),
            None => Arc::new(NeutralFeed),
        };
        let geo: Arc<dyn GeoLookup> = match &collaborators.geoip_url {
            Some(url) => Arc::new(HttpGeoLookup::new(url, collaborators.timeout())?),
            None => Arc::new(NoGeo),
        };
        info!(feed = feed.name(), geo = geo.name(), "Collaborators configured");
        Ok(Self::with_collaborators(config, feed, geo))
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// Always allow `ip`; removes it from the blacklist.
    pub fn add_to_whitelist(&self, ip: IpAddr) {
        self.access.allow(ip);
        info!(ip = %ip, "IP whitelisted");
    }

    /// Always deny `ip`; removes it from the whitelist.
    pub fn add_to_blacklist(&self, ip: IpAddr) {
        self.access.deny(ip);
        metrics::set_blacklist_size(self.access.denied_count());
        warn!(ip = %ip, "IP blacklisted");
    }

    pub fn remove_from_whitelist(&self, ip: IpAddr) -> bool {
        let removed = self.access.remove_allowed(ip);
        if removed {
            info!(ip = %ip, "IP removed from whitelist");
        }
        removed
    }

    pub fn remove_from_blacklist(&self, ip: IpAddr) -> bool {
        let removed = self.access.remove_denied(ip);
        if removed {
            metrics::set_blacklist_size(self.access.denied_count());
            info!(ip = %ip, "IP removed from blacklist");
        }
        removed
    }

    pub fn is_whitelisted(&self, ip: IpAddr) -> bool {
        self.access.is_allowed(ip)
    }

    pub fn is_blacklisted(&self, ip: IpAddr) -> bool {
        self.access.is_denied(ip)
    }

    /// Cached reputation for `ip`, if it has been seen.
    pub fn reputation(&self, ip: IpAddr) -> Option<IpReputation> {
        self.reputation.peek(ip)
    }

    /// Apply a reputation event, auto-blacklisting when the score collapses.
    pub async fn record_event(&self, ip: IpAddr, event: ReputationEvent) -> u8 {
        let score = self.reputation.update(ip, event).await;

        let settings = &self.config.ip_reputation;
        if settings.auto_blacklist_enabled
            && score < settings.auto_blacklist_threshold
            && !self.access.is_denied(ip)
        {
            self.access.deny(ip);
            metrics::set_blacklist_size(self.access.denied_count());
            warn!(ip = %ip, score, "IP auto-blacklisted");
        }
        score
    }

    /// Circuit breakers for protecting downstream operations.
    pub fn breakers(&self) -> &CircuitBreakerRegistry {
        &self.breakers
    }

    pub fn status(&self) -> ShieldStatus {
        ShieldStatus {
            enabled: true,
            metrics: self.metrics.snapshot(),
            blacklisted_count: self.access.denied_count(),
            whitelisted_count: self.access.allowed_count(),
            active_rate_limiters: self.limiter.len(),
            tracked_reputations: self.reputation.len(),
            circuit_breakers: self.breakers.len(),
        }
    }

    /// Close the metrics window.
    pub fn tick_metrics(&self) -> AttackMetrics {
        metrics::set_active_rate_limiters(self.limiter.len());
        self.metrics.tick(self.access.denied_count())
    }

    /// Drop idle per-key state.
    pub fn cleanup(&self) -> CleanupReport {
        CleanupReport {
            rate_limiters: self.limiter.cleanup(),
            reputations: self.reputation.purge_expired(),
            breakers: self.breakers.cleanup(),
        }
    }
}
