//! Country allow-list enforcement.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::collaborators::GeoLookup;
use crate::config::{FailAction, ResponseConfig};
use crate::observability::metrics;
use crate::resilience::timeouts::bounded;

/// Outcome of a geo check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoVerdict {
    Allow,
    Deny(String),
}

pub struct GeoPolicy {
    enabled: bool,
    allowed: HashSet<String>,
    fail_action: FailAction,
    lookup: Arc<dyn GeoLookup>,
    timeout: Duration,
}

impl GeoPolicy {
    pub fn new(config: &ResponseConfig, lookup: Arc<dyn GeoLookup>, timeout: Duration) -> Self {
        Self {
            enabled: config.enable_geo_blocking,
            allowed: config
                .allowed_countries
                .iter()
                .map(|c| c.trim().to_ascii_uppercase())
                .collect(),
            fail_action: config.geo_fail_action,
            lookup,
            timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check `ip`, reusing `known_country` when the caller already resolved it.
    pub async fn check(&self, ip: IpAddr, known_country: Option<&str>) -> GeoVerdict {
        if !self.enabled {
            return GeoVerdict::Allow;
        }

        let country = match known_country {
            Some(country) => Ok(Some(country.to_string())),
            None => bounded(self.timeout, self.lookup.country(ip)).await,
        };

        match country {
            Ok(Some(country)) => self.judge(&country),
            Ok(None) => self.unresolved(ip),
            Err(e) => {
                warn!(ip = %ip, geo = self.lookup.name(), error = %e, "GeoIP lookup failed");
                metrics::record_lookup_failure("geoip");
                self.unresolved(ip)
            }
        }
    }

    fn judge(&self, country: &str) -> GeoVerdict {
        let country = country.trim().to_ascii_uppercase();
        if self.allowed.contains(&country) {
            GeoVerdict::Allow
        } else {
            GeoVerdict::Deny(format!("requests from {} are not allowed", country))
        }
    }

    fn unresolved(&self, ip: IpAddr) -> GeoVerdict {
        match self.fail_action {
            FailAction::Allow => GeoVerdict::Allow,
            FailAction::Block => {
                warn!(ip = %ip, "Country unknown, failing closed");
                GeoVerdict::Deny("requests from unknown are not allowed".to_string())
            }
        }
    }
}
