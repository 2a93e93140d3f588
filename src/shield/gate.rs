//! Request gate: the ordered decision pipeline.
//!
//! Stages run cheapest first and the first terminal verdict wins:
//! validation, whitelist, blacklist, rate limit, reputation, behavior, geo,
//! content. A request that clears every stage earns reputation.

use std::net::IpAddr;
use tracing::{debug, info, warn};

use super::{Action, Decision, Shield, ShieldRequest, Stage};
use crate::observability::metrics;
use crate::security::{GeoVerdict, ListKind, ReputationEvent, Standing};

impl Shield {
    /// Decide what to do with `request`.
    pub async fn validate(&self, request: &ShieldRequest) -> Decision {
        let ip = request.client_ip();
        self.metrics.record_request(ip);

        let (stage, decision) = match ip {
            Some(ip) => self.evaluate(ip, request).await,
            None => (Stage::Validation, Decision::block("invalid client address")),
        };

        self.settle(ip, request, stage, &decision).await;
        decision
    }

    async fn evaluate(&self, ip: IpAddr, request: &ShieldRequest) -> (Stage, Decision) {
        match self.access.lookup(ip) {
            Some(ListKind::Allow) => return (Stage::Whitelist, Decision::allow()),
            Some(ListKind::Deny) => return (Stage::Blacklist, Decision::block("IP blacklisted")),
            None => {}
        }

        let admission = self.limiter.admit(ip);
        if !admission.allowed {
            self.record_event(ip, ReputationEvent::RateLimitExceeded).await;
            let response = &self.config.response;
            let decision = if response.enable_tarpit {
                Decision::tarpit("rate limit exceeded", response.tarpit_delay())
            } else {
                Decision::block("rate limit exceeded")
            };
            return (Stage::RateLimit, decision);
        }

        let record = self.reputation.get(ip).await;
        match self.reputation.standing(record.score) {
            Standing::Malicious => {
                return (Stage::Reputation, Decision::block("low IP reputation score"));
            }
            Standing::Suspicious if self.config.response.enable_captcha => {
                return (Stage::Reputation, Decision::captcha("suspicious IP reputation"));
            }
            _ => {}
        }

        let analysis = &self.config.traffic_analysis;
        if analysis.enable_behavior_analysis {
            let report = self.behavior.analyze(request);
            if report.score() >= analysis.anomaly_threshold {
                self.record_event(ip, ReputationEvent::SuspiciousBehavior).await;
                return (Stage::Behavior, Decision::block(report.reason()));
            }
        }

        if let GeoVerdict::Deny(reason) = self.geo.check(ip, record.country.as_deref()).await {
            return (Stage::Geo, Decision::block(reason));
        }

        if let Some(finding) = self.content.inspect(request) {
            return (
                Stage::Content,
                Decision::block(format!("malicious content detected: {}", finding)),
            );
        }

        (Stage::Passed, Decision::allow())
    }

    /// Bookkeeping after a verdict: reputation, refunds, metrics, logs.
    async fn settle(&self, ip: Option<IpAddr>, request: &ShieldRequest, stage: Stage, decision: &Decision) {
        metrics::record_decision(decision.action.as_str(), stage.as_str());
        let reason = decision.reason.as_deref().unwrap_or_default();

        match decision.action {
            Action::Allow => {
                if let (Stage::Passed, Some(ip)) = (stage, ip) {
                    self.reputation.update(ip, ReputationEvent::LegitimateRequest).await;
                    if self.config.rate_limit.skip_successful_requests {
                        self.limiter.refund(ip);
                    }
                }
                if self.metrics.should_sample() {
                    let country = ip
                        .and_then(|ip| self.reputation.peek(ip))
                        .and_then(|record| record.country);
                    self.metrics.record_allowed(request, country.as_deref());
                }
                debug!(ip = %request.ip, stage = stage.as_str(), "Request allowed");
            }
            Action::Block => {
                self.metrics.record_block(stage);
                warn!(ip = %request.ip, stage = stage.as_str(), reason, "Request blocked");
            }
            Action::Tarpit => {
                self.metrics.record_block(stage);
                info!(ip = %request.ip, delay_ms = decision.delay_ms, reason, "Request tarpitted");
            }
            Action::Captcha => {
                self.metrics.record_block(stage);
                info!(ip = %request.ip, reason, "CAPTCHA challenge issued");
            }
        }
    }
}
