//! Adaptive per-IP reputation.
//!
//! Every address carries a trust score in `0..=100` that pipeline events
//! push up or down. Unknown addresses are seeded from the reputation feed
//! and GeoIP collaborators; when either is slow or down the seed falls back
//! to a neutral record so the pipeline keeps moving.

use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::collaborators::{FeedReport, GeoLookup, ReputationFeed, NEUTRAL_SCORE};
use crate::config::IpReputationConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;
use crate::security::cache::ShardedTtlCache;

/// Violations remembered per address.
const MAX_VIOLATIONS: usize = 32;

/// Something the pipeline observed about an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReputationEvent {
    RateLimitExceeded,
    SuspiciousBehavior,
    LegitimateRequest,
}

impl ReputationEvent {
    /// Score adjustment applied by this event.
    pub fn delta(self) -> i16 {
        match self {
            ReputationEvent::RateLimitExceeded => -10,
            ReputationEvent::SuspiciousBehavior => -20,
            ReputationEvent::LegitimateRequest => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReputationEvent::RateLimitExceeded => "rate_limit_exceeded",
            ReputationEvent::SuspiciousBehavior => "suspicious_behavior",
            ReputationEvent::LegitimateRequest => "legitimate_request",
        }
    }

    fn is_violation(self) -> bool {
        self.delta() < 0
    }
}

/// Everything known about one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpReputation {
    pub ip: IpAddr,
    /// 0 = malicious, 100 = trusted.
    pub score: u8,
    /// Unix milliseconds of the last event.
    pub last_seen: u64,
    pub request_count: u64,
    pub violations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub is_tor: bool,
    pub is_vpn: bool,
}

impl IpReputation {
    /// Record for an address nobody knows anything about.
    pub fn neutral(ip: IpAddr) -> Self {
        Self::seeded(ip, FeedReport::default(), None)
    }

    fn seeded(ip: IpAddr, report: FeedReport, country: Option<String>) -> Self {
        Self {
            ip,
            score: report.score.min(100),
            last_seen: unix_millis(),
            request_count: 0,
            violations: Vec::new(),
            country,
            is_tor: report.is_tor,
            is_vpn: report.is_vpn,
        }
    }

    /// Apply `event`, keeping the score within `0..=100`.
    pub fn apply(&mut self, event: ReputationEvent) -> u8 {
        self.score = clamp_score(i16::from(self.score) + event.delta());
        self.request_count += 1;
        self.last_seen = unix_millis();
        if event.is_violation() {
            if self.violations.len() == MAX_VIOLATIONS {
                self.violations.remove(0);
            }
            self.violations.push(event.as_str().to_string());
        }
        self.score
    }
}

fn clamp_score(raw: i16) -> u8 {
    raw.clamp(0, 100) as u8
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// How the reputation stage should treat a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Trusted,
    Suspicious,
    Malicious,
}

/// Bounded, TTL-evicted reputation records.
pub struct ReputationStore {
    cache: ShardedTtlCache<IpAddr, IpReputation>,
    feed: Arc<dyn ReputationFeed>,
    geo: Arc<dyn GeoLookup>,
    lookup_timeout: Duration,
    block_threshold: u8,
    suspicious_threshold: u8,
}

impl ReputationStore {
    pub fn new(
        config: &IpReputationConfig,
        feed: Arc<dyn ReputationFeed>,
        geo: Arc<dyn GeoLookup>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            cache: ShardedTtlCache::new(config.cache_capacity, config.ttl()),
            feed,
            geo,
            lookup_timeout,
            block_threshold: config.block_threshold,
            suspicious_threshold: config.suspicious_threshold,
        }
    }

    /// Record for `ip`, fetching and caching it on first sight.
    pub async fn get(&self, ip: IpAddr) -> IpReputation {
        if let Some(cached) = self.cache.get(&ip) {
            return cached;
        }
        let fetched = self.fetch(ip).await;
        self.cache.insert_if_absent(ip, fetched)
    }

    /// Cached record for `ip`, without fetching.
    pub fn peek(&self, ip: IpAddr) -> Option<IpReputation> {
        self.cache.peek(&ip)
    }

    /// Apply `event` to `ip` and return the new score.
    pub async fn update(&self, ip: IpAddr, event: ReputationEvent) -> u8 {
        let seed = if self.cache.contains(&ip) {
            None
        } else {
            Some(self.fetch(ip).await)
        };

        let score = self.cache.upsert(
            ip,
            || seed.unwrap_or_else(|| IpReputation::neutral(ip)),
            |record| record.apply(event),
        );
        debug!(ip = %ip, event = event.as_str(), score, "Reputation updated");
        score
    }

    /// Classify a score against the configured thresholds.
    pub fn standing(&self, score: u8) -> Standing {
        if score < self.block_threshold {
            Standing::Malicious
        } else if score < self.suspicious_threshold {
            Standing::Suspicious
        } else {
            Standing::Trusted
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Seed a record from the collaborators, degrading to neutral values.
    async fn fetch(&self, ip: IpAddr) -> IpReputation {
        let (report, country) = tokio::join!(
            bounded(self.lookup_timeout, self.feed.lookup(ip)),
            bounded(self.lookup_timeout, self.geo.country(ip)),
        );

        let report = report.unwrap_or_else(|e| {
            warn!(ip = %ip, feed = self.feed.name(), error = %e, "Reputation lookup failed, using neutral score");
            metrics::record_lookup_failure("reputation");
            FeedReport {
                score: NEUTRAL_SCORE,
                ..FeedReport::default()
            }
        });
        let country = country.unwrap_or_else(|e| {
            warn!(ip = %ip, geo = self.geo.name(), error = %e, "GeoIP lookup failed");
            metrics::record_lookup_failure("geoip");
            None
        });

        IpReputation::seeded(ip, report, country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{LookupError, NeutralFeed, NoGeo};
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct FixedFeed(u8);

    #[async_trait]
    impl ReputationFeed for FixedFeed {
        async fn lookup(&self, _ip: IpAddr) -> Result<FeedReport, LookupError> {
            Ok(FeedReport {
                score: self.0,
                is_tor: true,
                is_vpn: false,
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct DownFeed;

    #[async_trait]
    impl ReputationFeed for DownFeed {
        async fn lookup(&self, _ip: IpAddr) -> Result<FeedReport, LookupError> {
            Err(LookupError::InvalidResponse("HTTP 503".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn store_with(feed: Arc<dyn ReputationFeed>) -> ReputationStore {
        ReputationStore::new(
            &IpReputationConfig::default(),
            feed,
            Arc::new(NoGeo),
            Duration::from_millis(100),
        )
    }

    fn ip() -> IpAddr {
        "10.0.0.3".parse().unwrap()
    }

    #[test]
    fn test_event_deltas_and_clamping() {
        let mut record = IpReputation::neutral(ip());
        assert_eq!(record.score, 75);

        for _ in 0..20 {
            record.apply(ReputationEvent::SuspiciousBehavior);
        }
        assert_eq!(record.score, 0);

        record.score = 100;
        assert_eq!(record.apply(ReputationEvent::LegitimateRequest), 100);
        assert_eq!(record.request_count, 21);
    }

    #[test]
    fn test_violation_history_is_bounded() {
        let mut record = IpReputation::neutral(ip());
        for _ in 0..100 {
            record.apply(ReputationEvent::RateLimitExceeded);
        }
        record.apply(ReputationEvent::LegitimateRequest);
        assert_eq!(record.violations.len(), MAX_VIOLATIONS);
        assert!(record.violations.iter().all(|v| v == "rate_limit_exceeded"));
    }

    fn any_event() -> impl Strategy<Value = ReputationEvent> {
        prop_oneof![
            Just(ReputationEvent::RateLimitExceeded),
            Just(ReputationEvent::SuspiciousBehavior),
            Just(ReputationEvent::LegitimateRequest),
        ]
    }

    proptest! {
        #[test]
        fn test_score_stays_in_range(
            start in 0u8..=100,
            events in prop::collection::vec(any_event(), 0..200),
        ) {
            let mut record = IpReputation::neutral(ip());
            record.score = start;
            for event in &events {
                let score = record.apply(*event);
                prop_assert!(score <= 100);
                prop_assert_eq!(score, record.score);
            }
            prop_assert_eq!(record.request_count, events.len() as u64);
            prop_assert!(record.violations.len() <= MAX_VIOLATIONS);
        }
    }

    #[tokio::test]
    async fn test_seeded_from_feed() {
        let store = store_with(Arc::new(FixedFeed(40)));
        let record = store.get(ip()).await;
        assert_eq!(record.score, 40);
        assert!(record.is_tor);
        assert_eq!(store.standing(record.score), Standing::Suspicious);
    }

    #[tokio::test]
    async fn test_failed_feed_degrades_to_neutral() {
        let store = store_with(Arc::new(DownFeed));
        let record = store.get(ip()).await;
        assert_eq!(record.score, NEUTRAL_SCORE);
    }

    #[tokio::test]
    async fn test_update_sequence() {
        let store = store_with(Arc::new(NeutralFeed));
        let mut score = 0;
        for _ in 0..6 {
            score = store.update(ip(), ReputationEvent::RateLimitExceeded).await;
        }
        assert_eq!(score, 15);
        assert_eq!(store.peek(ip()).unwrap().violations.len(), 6);
        assert_eq!(store.standing(score), Standing::Malicious);
    }

    #[test]
    fn test_standing_thresholds() {
        let store = store_with(Arc::new(NeutralFeed));
        assert_eq!(store.standing(19), Standing::Malicious);
        assert_eq!(store.standing(20), Standing::Suspicious);
        assert_eq!(store.standing(49), Standing::Suspicious);
        assert_eq!(store.standing(50), Standing::Trusted);
    }
}
