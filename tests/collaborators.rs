//! HTTP collaborator adapters against local mock services.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use common::{browser, config_with, ip, start_programmable_backend};
use request_shield::collaborators::{
    GeoLookup, HttpGeoLookup, HttpReputationFeed, LookupError, ReputationFeed,
};
use request_shield::{Action, Shield};

fn template(addr: SocketAddr, route: &str) -> String {
    format!("http://{}/{}/{{ip}}", addr, route)
}

#[tokio::test]
async fn test_reputation_feed_parses_report() {
    let addr = start_programmable_backend(|path| async move {
        if path == "/reputation/192.0.2.1" {
            (200, r#"{"score": 12, "isTor": true, "isVPN": false}"#.to_string())
        } else {
            (404, "{}".to_string())
        }
    })
    .await;

    let feed = HttpReputationFeed::new(&template(addr, "reputation"), Duration::from_secs(2)).unwrap();
    let report = feed.lookup(ip("192.0.2.1")).await.unwrap();
    assert_eq!(report.score, 12);
    assert!(report.is_tor);
    assert!(!report.is_vpn);

    let missing = feed.lookup(ip("192.0.2.2")).await;
    assert!(matches!(missing, Err(LookupError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_geo_lookup_normalizes_country() {
    let addr = start_programmable_backend(|_| async {
        (200, r#"{"countryCode": " de "}"#.to_string())
    })
    .await;

    let geo = HttpGeoLookup::new(&template(addr, "geo"), Duration::from_secs(2)).unwrap();
    assert_eq!(geo.country(ip("192.0.2.3")).await.unwrap(), Some("DE".to_string()));
}

#[tokio::test]
async fn test_geo_lookup_without_country() {
    let addr = start_programmable_backend(|_| async { (200, "{}".to_string()) }).await;

    let geo = HttpGeoLookup::new(&template(addr, "geo"), Duration::from_secs(2)).unwrap();
    assert_eq!(geo.country(ip("192.0.2.4")).await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error_is_lookup_failure() {
    let addr = start_programmable_backend(|_| async { (503, "{}".to_string()) }).await;

    let feed = HttpReputationFeed::new(&template(addr, "reputation"), Duration::from_secs(2)).unwrap();
    let result = feed.lookup(ip("192.0.2.5")).await;
    assert!(matches!(result, Err(LookupError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_shield_uses_configured_feed() {
    let addr = start_programmable_backend(|path| async move {
        if path.starts_with("/reputation/") {
            (200, r#"{"score": 15}"#.to_string())
        } else {
            (200, r#"{"country": "NL"}"#.to_string())
        }
    })
    .await;

    let config = config_with(|c| {
        c.collaborators.reputation_url = Some(template(addr, "reputation"));
        c.collaborators.geoip_url = Some(template(addr, "geo"));
        c.collaborators.timeout_ms = 2_000;
    });
    let shield = Shield::from_config(config).unwrap();

    let decision = shield.validate(&browser("192.0.2.6", "/")).await;
    assert_eq!(decision.action, Action::Block);
    assert_eq!(decision.reason.as_deref(), Some("low IP reputation score"));

    let record = shield.reputation(ip("192.0.2.6")).unwrap();
    assert_eq!(record.country.as_deref(), Some("NL"));
}

#[tokio::test]
async fn test_slow_feed_degrades_to_neutral() {
    let addr = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        (200, r#"{"score": 5}"#.to_string())
    })
    .await;

    let config = config_with(|c| {
        c.collaborators.reputation_url = Some(template(addr, "reputation"));
        c.collaborators.timeout_ms = 100;
    });
    let shield = Shield::from_config(config).unwrap();

    let decision = shield.validate(&browser("192.0.2.7", "/")).await;
    assert!(decision.allowed);
    // neutral seed plus one legitimate request
    assert_eq!(shield.reputation(ip("192.0.2.7")).unwrap().score, 76);
}
