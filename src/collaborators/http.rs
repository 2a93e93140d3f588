//! JSON-over-HTTP collaborator adapters.
//!
//! Endpoints are URL templates with an `{ip}` placeholder, e.g.
//! `http://reputation.internal/v1/ip/{ip}`. The reputation endpoint must
//! answer `{"score": 0..=100, "isTor": bool, "isVPN": bool}`; the GeoIP
//! endpoint `{"country": "DE"}` (or `countryCode`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

use super::{FeedReport, GeoLookup, LookupError, ReputationFeed};

const PLACEHOLDER: &str = "{ip}";

/// A validated `{ip}` URL template.
#[derive(Debug, Clone)]
struct Endpoint {
    template: String,
}

impl Endpoint {
    fn parse(template: &str) -> Result<Self, LookupError> {
        if !template.contains(PLACEHOLDER) {
            return Err(LookupError::Endpoint(format!(
                "'{}' has no {} placeholder",
                template, PLACEHOLDER
            )));
        }
        url::Url::parse(&template.replace(PLACEHOLDER, "192.0.2.1"))
            .map_err(|e| LookupError::Endpoint(format!("'{}': {}", template, e)))?;
        Ok(Self {
            template: template.to_string(),
        })
    }

    fn for_ip(&self, ip: IpAddr) -> String {
        self.template.replace(PLACEHOLDER, &ip.to_string())
    }
}

fn build_client(timeout: Duration) -> Result<Client, LookupError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

async fn get_json<T: for<'de> Deserialize<'de>>(client: &Client, url: &str) -> Result<T, LookupError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Http(e)
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::InvalidResponse(format!("HTTP {}", status)));
    }

    response
        .json()
        .await
        .map_err(|e| LookupError::InvalidResponse(format!("failed to parse response: {}", e)))
}

/// Reputation feed backed by an HTTP JSON endpoint.
pub struct HttpReputationFeed {
    client: Client,
    endpoint: Endpoint,
}

impl HttpReputationFeed {
    pub fn new(template: &str, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: Endpoint::parse(template)?,
        })
    }
}

#[async_trait]
impl ReputationFeed for HttpReputationFeed {
    async fn lookup(&self, ip: IpAddr) -> Result<FeedReport, LookupError> {
        debug!(ip = %ip, "Querying reputation feed");
        let mut report: FeedReport = get_json(&self.client, &self.endpoint.for_ip(ip)).await?;
        report.score = report.score.min(100);
        Ok(report)
    }

    fn name(&self) -> &str {
        "http-reputation"
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default, alias = "countryCode", alias = "country_code")]
    country: Option<String>,
}

/// GeoIP lookup backed by an HTTP JSON endpoint.
pub struct HttpGeoLookup {
    client: Client,
    endpoint: Endpoint,
}

impl HttpGeoLookup {
    pub fn new(template: &str, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: Endpoint::parse(template)?,
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn country(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        debug!(ip = %ip, "Querying GeoIP");
        let response: GeoResponse = get_json(&self.client, &self.endpoint.for_ip(ip)).await?;
        Ok(response
            .country
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty()))
    }

    fn name(&self) -> &str {
        "http-geoip"
    }
}
