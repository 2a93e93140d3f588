//! External lookup collaborators.
//!
//! The shield consumes two best-effort services: a reputation feed and a
//! GeoIP lookup. Both sit behind async traits so deployments can plug in
//! whatever vendor they use. Callers wrap every call in a deadline and fall
//! back to neutral values; nothing here may fail a request on its own.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

pub use http::{HttpGeoLookup, HttpReputationFeed};

/// Score given to addresses nobody knows anything about.
pub const NEUTRAL_SCORE: u8 = 75;

/// What a reputation feed knows about an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedReport {
    /// Trust score, 0 = malicious, 100 = trusted.
    pub score: u8,
    #[serde(default, alias = "isTor")]
    pub is_tor: bool,
    #[serde(default, alias = "isVPN", alias = "isVpn")]
    pub is_vpn: bool,
}

impl Default for FeedReport {
    fn default() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            is_tor: false,
            is_vpn: false,
        }
    }
}

/// Errors from a collaborator lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lookup timed out")]
    Timeout,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl From<tokio::time::error::Elapsed> for LookupError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LookupError::Timeout
    }
}

/// Source of per-IP reputation scores.
#[async_trait]
pub trait ReputationFeed: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<FeedReport, LookupError>;

    /// Name for logs and metrics.
    fn name(&self) -> &str;
}

/// Source of IP to country mappings.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// ISO country code, `None` when the address is not mapped.
    async fn country(&self, ip: IpAddr) -> Result<Option<String>, LookupError>;

    fn name(&self) -> &str;
}

/// Feed that rates every address as neutral.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralFeed;

#[async_trait]
impl ReputationFeed for NeutralFeed {
    async fn lookup(&self, _ip: IpAddr) -> Result<FeedReport, LookupError> {
        Ok(FeedReport::default())
    }

    fn name(&self) -> &str {
        "neutral"
    }
}

/// Geo lookup that never resolves a country.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeo;

#[async_trait]
impl GeoLookup for NoGeo {
    async fn country(&self, _ip: IpAddr) -> Result<Option<String>, LookupError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_neutral_defaults() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let report = NeutralFeed.lookup(ip).await.unwrap();
        assert_eq!(report.score, NEUTRAL_SCORE);
        assert!(!report.is_tor && !report.is_vpn);
        assert_eq!(NoGeo.country(ip).await.unwrap(), None);
    }

    #[test]
    fn test_feed_report_accepts_camel_case() {
        let report: FeedReport =
            serde_json::from_str(r#"{"score": 12, "isTor": true, "isVPN": false}"#).unwrap();
        assert_eq!(report.score, 12);
        assert!(report.is_tor);
    }
}
