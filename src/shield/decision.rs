//! Pipeline verdicts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
    Tarpit,
    Captcha,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Block => "block",
            Action::Tarpit => "tarpit",
            Action::Captcha => "captcha",
        }
    }
}

/// Pipeline stage that produced a decision, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Validation,
    Whitelist,
    Blacklist,
    RateLimit,
    Reputation,
    Behavior,
    Geo,
    Content,
    Passed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Whitelist => "whitelist",
            Stage::Blacklist => "blacklist",
            Stage::RateLimit => "rate_limit",
            Stage::Reputation => "reputation",
            Stage::Behavior => "behavior",
            Stage::Geo => "geo",
            Stage::Content => "content",
            Stage::Passed => "passed",
        }
    }
}

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub action: Action,
    /// Tarpit delay in milliseconds.
    #[serde(default, rename = "delay", skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            action: Action::Allow,
            delay_ms: None,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            action: Action::Block,
            delay_ms: None,
        }
    }

    pub fn tarpit(reason: impl Into<String>, delay: Duration) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            action: Action::Tarpit,
            delay_ms: Some(delay.as_millis() as u64),
        }
    }

    pub fn captcha(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            action: Action::Captcha,
            delay_ms: None,
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}
