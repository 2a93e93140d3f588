//! Rolling attack metrics and severity.
//!
//! Counters accumulate between ticks; [`MetricsAggregator::tick`] turns the
//! window into a snapshot and starts a new one. User agents, paths and
//! countries of allowed requests are sampled into a bounded key space.

use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

use crate::observability::metrics;
use crate::shield::{ShieldRequest, Stage};

/// Distinct user agents / paths / countries tracked before new keys are ignored.
const MAX_TRACKED_KEYS: usize = 10_000;
const MAX_KEY_LEN: usize = 256;
const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Either signal alone is enough to raise the level.
    pub fn classify(requests_per_second: f64, blacklisted: usize) -> Self {
        if requests_per_second > 10_000.0 || blacklisted > 1_000 {
            Severity::Critical
        } else if requests_per_second > 5_000.0 || blacklisted > 500 {
            Severity::High
        } else if requests_per_second > 1_000.0 || blacklisted > 100 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    fn level(self) -> u8 {
        self as u8
    }
}

/// Snapshot produced by the last tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackMetrics {
    pub requests_per_second: f64,
    pub unique_ips: usize,
    pub top_user_agents: BTreeMap<String, u64>,
    pub top_paths: BTreeMap<String, u64>,
    /// Sampled allowed requests per country; "unknown" when unresolved.
    pub geo_distribution: BTreeMap<String, u64>,
    /// Blocks per pipeline stage since startup.
    pub blocked_by_stage: BTreeMap<String, u64>,
    pub severity: Severity,
    pub total_requests: u64,
    pub total_blocked: u64,
}

pub struct MetricsAggregator {
    window_requests: AtomicU64,
    window_ips: DashSet<IpAddr>,
    window_start: Mutex<Instant>,
    user_agents: DashMap<String, u64>,
    paths: DashMap<String, u64>,
    countries: DashMap<String, u64>,
    blocked: DashMap<Stage, u64>,
    total_requests: AtomicU64,
    total_blocked: AtomicU64,
    sample_rate: f64,
    snapshot: RwLock<AttackMetrics>,
}

impl MetricsAggregator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            window_requests: AtomicU64::new(0),
            window_ips: DashSet::new(),
            window_start: Mutex::new(Instant::now()),
            user_agents: DashMap::new(),
            paths: DashMap::new(),
            countries: DashMap::new(),
            blocked: DashMap::new(),
            total_requests: AtomicU64::new(0),
            total_blocked: AtomicU64::new(0),
            sample_rate: if sample_rate.is_finite() {
                sample_rate.clamp(0.0, 1.0)
            } else {
                0.0
            },
            snapshot: RwLock::new(AttackMetrics::default()),
        }
    }

    /// Count one validated request.
    pub fn record_request(&self, ip: Option<IpAddr>) {
        self.window_requests.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(ip) = ip {
            self.window_ips.insert(ip);
        }
    }

    /// Roll the dice for one allowed request.
    pub fn should_sample(&self) -> bool {
        self.sample_rate > 0.0 && rand::thread_rng().gen_bool(self.sample_rate)
    }

    /// Count a sampled allowed request's user agent, path and country.
    pub fn record_allowed(&self, request: &ShieldRequest, country: Option<&str>) {
        if let Some(ua) = request.user_agent() {
            bump_bounded(&self.user_agents, ua);
        }
        if !request.path.is_empty() {
            bump_bounded(&self.paths, &request.path);
        }
        bump_bounded(&self.countries, country.unwrap_or("unknown"));
    }

    /// Count a terminal block by `stage`.
    pub fn record_block(&self, stage: Stage) {
        *self.blocked.entry(stage).or_insert(0) += 1;
        self.total_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// Close the current window and publish a new snapshot.
    pub fn tick(&self, blacklisted: usize) -> AttackMetrics {
        let now = Instant::now();
        let elapsed = {
            let mut start = self.window_start.lock();
            let elapsed = now.duration_since(*start);
            *start = now;
            elapsed
        };

        let requests = self.window_requests.swap(0, Ordering::Relaxed);
        let requests_per_second = if elapsed.is_zero() {
            requests as f64
        } else {
            requests as f64 / elapsed.as_secs_f64()
        };
        let unique_ips = self.window_ips.len();
        self.window_ips.clear();

        let severity = Severity::classify(requests_per_second, blacklisted);
        let snapshot = AttackMetrics {
            requests_per_second,
            unique_ips,
            top_user_agents: top_n(&self.user_agents),
            top_paths: top_n(&self.paths),
            geo_distribution: top_n(&self.countries),
            blocked_by_stage: self
                .blocked
                .iter()
                .map(|entry| (entry.key().as_str().to_string(), *entry.value()))
                .collect(),
            severity,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_blocked: self.total_blocked.load(Ordering::Relaxed),
        };

        metrics::set_requests_per_second(requests_per_second);
        metrics::set_severity(severity.level());
        metrics::set_blacklist_size(blacklisted);

        *self.snapshot.write() = snapshot.clone();
        snapshot
    }

    pub fn snapshot(&self) -> AttackMetrics {
        self.snapshot.read().clone()
    }
}

fn bump_bounded(counts: &DashMap<String, u64>, key: &str) {
    let key = truncate(key);
    if let Some(mut count) = counts.get_mut(key) {
        *count += 1;
        return;
    }
    if counts.len() < MAX_TRACKED_KEYS {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
}

fn truncate(key: &str) -> &str {
    match key.char_indices().nth(MAX_KEY_LEN) {
        Some((index, _)) => &key[..index],
        None => key,
    }
}

fn top_n(counts: &DashMap<String, u64>) -> BTreeMap<String, u64> {
    let mut entries: Vec<(String, u64)> = counts
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(TOP_N).collect()
}
