//! End-to-end decision pipeline tests.
//!
//! Drives `Shield::validate` with realistic request sequences and checks
//! verdicts, reputation side effects and attack metrics.

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use common::{browser, config_with, ip, shield_with, FailingGeo, StaticFeed, StaticGeo};
use request_shield::collaborators::NeutralFeed;
use request_shield::config::FailAction;
use request_shield::security::ReputationEvent;
use request_shield::{Action, Shield, ShieldRequest};

#[tokio::test]
async fn test_rate_limit_tarpits_sixth_request() {
    let shield = shield_with(|c| c.rate_limit.max_requests = 5);

    for i in 0..5 {
        let decision = shield.validate(&browser("198.51.100.1", "/")).await;
        assert!(decision.allowed, "request {} should pass", i + 1);
    }

    let decision = shield.validate(&browser("198.51.100.1", "/")).await;
    assert!(!decision.allowed);
    assert_eq!(decision.action, Action::Tarpit);
    assert_eq!(decision.reason.as_deref(), Some("rate limit exceeded"));
    assert_eq!(decision.delay_ms, Some(5_000));

    // Other addresses keep their own window
    assert!(shield.validate(&browser("198.51.100.2", "/")).await.allowed);
}

#[tokio::test]
async fn test_rate_limit_blocks_without_tarpit() {
    let shield = shield_with(|c| {
        c.rate_limit.max_requests = 5;
        c.response.enable_tarpit = false;
    });

    for _ in 0..5 {
        shield.validate(&browser("198.51.100.3", "/")).await;
    }
    let decision = shield.validate(&browser("198.51.100.3", "/")).await;
    assert_eq!(decision.action, Action::Block);
    assert_eq!(decision.delay_ms, None);
}

#[tokio::test]
async fn test_rate_limit_violation_costs_reputation() {
    let shield = shield_with(|c| c.rate_limit.max_requests = 1);
    let addr = ip("198.51.100.4");

    shield.validate(&browser("198.51.100.4", "/")).await;
    assert_eq!(shield.reputation(addr).unwrap().score, 76);

    shield.validate(&browser("198.51.100.4", "/")).await;
    let record = shield.reputation(addr).unwrap();
    assert_eq!(record.score, 66);
    assert_eq!(record.violations, vec!["rate_limit_exceeded".to_string()]);
}

#[tokio::test]
async fn test_address_flood_keeps_limiter_bounded() {
    let shield = shield_with(|c| {
        c.rate_limit.max_requests = 2;
        c.rate_limit.max_tracked_keys = 1_000;
    });

    for i in 0..20_000u32 {
        let addr = IpAddr::from(Ipv4Addr::from(0x0A00_0000 + i));
        let decision = shield.validate(&browser(&addr.to_string(), "/")).await;
        assert!(decision.allowed);
    }
    // per-shard capacity rounds up across 16 shards
    assert!(shield.status().active_rate_limiters <= 1_008);

    assert!(shield.validate(&browser("198.51.100.5", "/")).await.allowed);
    assert!(shield.validate(&browser("198.51.100.5", "/")).await.allowed);
    let decision = shield.validate(&browser("198.51.100.5", "/")).await;
    assert_eq!(decision.action, Action::Tarpit);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_window() {
    let shield = shield_with(|c| {
        c.rate_limit.max_requests = 5;
        c.ip_reputation.auto_blacklist_enabled = false;
        c.ip_reputation.auto_blacklist_threshold = 0;
        c.ip_reputation.block_threshold = 0;
        c.ip_reputation.suspicious_threshold = 0;
    });

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let shield = shield.clone();
            tokio::spawn(async move {
                let request = browser("198.51.100.6", "/");
                shield.validate(&request).await
            })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        let decision = handle.await.unwrap();
        if decision.allowed {
            allowed += 1;
        } else {
            assert_eq!(decision.reason.as_deref(), Some("rate limit exceeded"));
        }
    }
    assert_eq!(allowed, 5);

    let record = shield.reputation(ip("198.51.100.6")).unwrap();
    assert_eq!(record.request_count, 40);
    assert_eq!(record.violations.len(), 32);
}

#[tokio::test]
async fn test_whitelist_bypasses_every_check() {
    let shield = shield_with(|c| c.rate_limit.max_requests = 1);
    shield.add_to_whitelist(ip("203.0.113.10"));

    for _ in 0..10 {
        let request = ShieldRequest::new("203.0.113.10")
            .with_path("/../../etc/passwd")
            .with_user_agent("sqlmap-bot");
        let decision = shield.validate(&request).await;
        assert!(decision.allowed);
        assert_eq!(decision.action, Action::Allow);
    }
}

#[tokio::test]
async fn test_blacklist_denies_clean_requests() {
    let shield = shield_with(|_| {});
    shield.add_to_blacklist(ip("203.0.113.11"));

    let decision = shield.validate(&browser("203.0.113.11", "/")).await;
    assert!(!decision.allowed);
    assert_eq!(decision.reason.as_deref(), Some("IP blacklisted"));
}

#[tokio::test]
async fn test_collapsing_reputation_auto_blacklists() {
    let shield = shield_with(|_| {});
    let addr = ip("203.0.113.12");

    let mut score = 0;
    for _ in 0..6 {
        score = shield.record_event(addr, ReputationEvent::RateLimitExceeded).await;
    }
    assert_eq!(score, 15);
    assert!(!shield.is_blacklisted(addr));

    let score = shield.record_event(addr, ReputationEvent::RateLimitExceeded).await;
    assert_eq!(score, 5);
    assert!(shield.is_blacklisted(addr));

    let decision = shield.validate(&browser("203.0.113.12", "/")).await;
    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().contains("blacklisted"));
}

#[tokio::test]
async fn test_reputation_stays_bounded() {
    let shield = shield_with(|c| c.ip_reputation.auto_blacklist_enabled = false);
    let addr = ip("203.0.113.13");

    for _ in 0..20 {
        let score = shield.record_event(addr, ReputationEvent::SuspiciousBehavior).await;
        assert!(score <= 100);
    }
    assert_eq!(shield.reputation(addr).unwrap().score, 0);

    for _ in 0..150 {
        shield.record_event(addr, ReputationEvent::LegitimateRequest).await;
    }
    let record = shield.reputation(addr).unwrap();
    assert_eq!(record.score, 100);
    assert!(record.violations.len() <= 32);
}

#[tokio::test]
async fn test_clean_request_passes_behavior_analysis() {
    let shield = shield_with(|_| {});
    let decision = shield.validate(&browser("192.0.2.20", "/products/42")).await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_scanner_blocked_by_behavior() {
    let shield = shield_with(|_| {});
    let request = ShieldRequest::new("192.0.2.21")
        .with_path("/wp-admin/setup.php")
        .with_user_agent("python-bot/1.0");

    let decision = shield.validate(&request).await;
    assert_eq!(decision.action, Action::Block);
    assert_eq!(
        decision.reason.as_deref(),
        Some("suspicious behavioral patterns detected")
    );
    assert_eq!(shield.reputation(ip("192.0.2.21")).unwrap().score, 55);
}

#[tokio::test]
async fn test_behavior_analysis_can_be_disabled() {
    let shield = shield_with(|c| c.traffic_analysis.enable_behavior_analysis = false);
    let request = ShieldRequest::new("192.0.2.22")
        .with_path("/wp-admin/setup.php")
        .with_user_agent("python-bot/1.0");

    assert!(shield.validate(&request).await.allowed);
}

#[tokio::test]
async fn test_sql_injection_blocked_by_content_inspection() {
    let shield = shield_with(|_| {});
    let request = browser("192.0.2.23", "/search?q=1 union select password from users");

    let decision = shield.validate(&request).await;
    assert!(!decision.allowed);
    assert_eq!(decision.action, Action::Block);
    let reason = decision.reason.unwrap();
    assert!(reason.starts_with("malicious content detected"));
    assert!(reason.contains("sql injection"));
}

#[tokio::test]
async fn test_oversized_body_blocked() {
    let shield = shield_with(|c| c.content.max_content_length = 1024);
    let request = browser("192.0.2.24", "/upload").with_content_length(4096);

    let decision = shield.validate(&request).await;
    assert_eq!(
        decision.reason.as_deref(),
        Some("malicious content detected: content length 4096 exceeds 1024")
    );
}

#[tokio::test]
async fn test_low_feed_score_blocks() {
    let shield = Shield::with_collaborators(
        config_with(|_| {}),
        Arc::new(StaticFeed(15)),
        Arc::new(StaticGeo(None)),
    );

    let decision = shield.validate(&browser("192.0.2.30", "/")).await;
    assert_eq!(decision.action, Action::Block);
    assert_eq!(decision.reason.as_deref(), Some("low IP reputation score"));
}

#[tokio::test]
async fn test_suspicious_feed_score_challenges() {
    let shield = Shield::with_collaborators(
        config_with(|_| {}),
        Arc::new(StaticFeed(40)),
        Arc::new(StaticGeo(None)),
    );

    let decision = shield.validate(&browser("192.0.2.31", "/")).await;
    assert_eq!(decision.action, Action::Captcha);
    assert!(!decision.allowed);
}

#[tokio::test]
async fn test_suspicious_score_passes_without_captcha() {
    let shield = Shield::with_collaborators(
        config_with(|c| c.response.enable_captcha = false),
        Arc::new(StaticFeed(40)),
        Arc::new(StaticGeo(None)),
    );

    assert!(shield.validate(&browser("192.0.2.32", "/")).await.allowed);
}

#[tokio::test]
async fn test_geo_blocking_denies_unlisted_country() {
    let config = config_with(|c| {
        c.response.enable_geo_blocking = true;
        c.response.allowed_countries = vec!["DE".into(), "FR".into()];
    });

    let shield = Shield::with_collaborators(
        config.clone(),
        Arc::new(NeutralFeed),
        Arc::new(StaticGeo(Some("US"))),
    );
    let decision = shield.validate(&browser("192.0.2.40", "/")).await;
    assert_eq!(decision.reason.as_deref(), Some("requests from US are not allowed"));

    let shield = Shield::with_collaborators(config, Arc::new(NeutralFeed), Arc::new(StaticGeo(Some("DE"))));
    assert!(shield.validate(&browser("192.0.2.41", "/")).await.allowed);
}

#[tokio::test]
async fn test_geo_failure_follows_fail_action() {
    let open = config_with(|c| {
        c.response.enable_geo_blocking = true;
        c.response.allowed_countries = vec!["DE".into()];
    });
    let mut closed = open.clone();
    closed.response.geo_fail_action = FailAction::Block;

    let shield = Shield::with_collaborators(open, Arc::new(NeutralFeed), Arc::new(FailingGeo));
    assert!(shield.validate(&browser("192.0.2.42", "/")).await.allowed);

    let shield = Shield::with_collaborators(closed, Arc::new(NeutralFeed), Arc::new(FailingGeo));
    let decision = shield.validate(&browser("192.0.2.43", "/")).await;
    assert_eq!(
        decision.reason.as_deref(),
        Some("requests from unknown are not allowed")
    );
}

#[tokio::test]
async fn test_metrics_count_blocks_per_stage() {
    let shield = shield_with(|c| c.rate_limit.max_requests = 1);
    shield.add_to_blacklist(ip("192.0.2.50"));

    shield.validate(&browser("192.0.2.50", "/")).await;
    shield.validate(&browser("192.0.2.51", "/")).await;
    shield.validate(&browser("192.0.2.51", "/")).await;
    shield.validate(&browser("not-an-address", "/")).await;

    let metrics = shield.tick_metrics();
    assert_eq!(metrics.total_requests, 4);
    assert_eq!(metrics.total_blocked, 3);
    assert_eq!(metrics.blocked_by_stage.get("blacklist"), Some(&1));
    assert_eq!(metrics.blocked_by_stage.get("rate_limit"), Some(&1));
    assert_eq!(metrics.blocked_by_stage.get("validation"), Some(&1));
    assert_eq!(metrics.unique_ips, 2);

    let status = shield.status();
    assert_eq!(status.blacklisted_count, 1);
    assert_eq!(status.active_rate_limiters, 1);
}

#[tokio::test]
async fn test_metrics_track_allowed_countries() {
    let shield = Shield::with_collaborators(
        config_with(|c| c.traffic_analysis.sample_rate = 1.0),
        Arc::new(NeutralFeed),
        Arc::new(StaticGeo(Some("DE"))),
    );
    shield.add_to_whitelist(ip("192.0.2.53"));

    for _ in 0..3 {
        shield.validate(&browser("192.0.2.52", "/")).await;
    }
    shield.validate(&browser("192.0.2.53", "/")).await;

    let metrics = shield.tick_metrics();
    assert_eq!(metrics.geo_distribution.get("DE"), Some(&3));
    assert_eq!(metrics.geo_distribution.get("unknown"), Some(&1));
}

#[tokio::test]
async fn test_nan_sample_rate_does_not_panic() {
    let shield = shield_with(|c| c.traffic_analysis.sample_rate = f64::NAN);

    assert!(shield.validate(&browser("192.0.2.54", "/")).await.allowed);
    assert!(shield.tick_metrics().top_paths.is_empty());
}

#[tokio::test]
async fn test_cleanup_keeps_live_state() {
    let shield = shield_with(|_| {});
    shield.validate(&browser("192.0.2.60", "/")).await;

    let report = shield.cleanup();
    assert_eq!(report.total(), 0);
    assert_eq!(shield.status().tracked_reputations, 1);
}
