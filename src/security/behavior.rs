//! Heuristic behavior scoring.
//!
//! Each indicator counts at most once per request. The gate compares the
//! total against `anomaly_threshold`.

use regex::Regex;
use std::fmt;

use crate::shield::ShieldRequest;

/// One heuristic that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    BotUserAgent,
    ScriptExtension,
    AdminPath,
    SqlSignature,
    XssSignature,
    MissingHeaders,
}

impl Indicator {
    pub fn as_str(self) -> &'static str {
        match self {
            Indicator::BotUserAgent => "bot user agent",
            Indicator::ScriptExtension => "script extension",
            Indicator::AdminPath => "admin path",
            Indicator::SqlSignature => "sql injection pattern",
            Indicator::XssSignature => "xss pattern",
            Indicator::MissingHeaders => "missing headers",
        }
    }

    pub fn is_injection(self) -> bool {
        matches!(self, Indicator::SqlSignature | Indicator::XssSignature)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicators that fired for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BehaviorReport {
    pub indicators: Vec<Indicator>,
}

impl BehaviorReport {
    pub fn score(&self) -> usize {
        self.indicators.len()
    }

    /// First injection indicator, if any.
    pub fn injection(&self) -> Option<Indicator> {
        self.indicators.iter().copied().find(|i| i.is_injection())
    }

    /// Block reason for a report at or over the threshold.
    pub fn reason(&self) -> String {
        match self.injection() {
            Some(indicator) => format!("suspicious behavioral patterns detected: {}", indicator),
            None => "suspicious behavioral patterns detected".to_string(),
        }
    }
}

pub struct BehaviorAnalyzer {
    bot_agent: Regex,
    script_extension: Regex,
    admin_path: Regex,
    sql: Regex,
    xss: Regex,
}

impl BehaviorAnalyzer {
    pub fn new() -> Self {
        Self {
            bot_agent: Regex::new(r"(?i)bot|crawler|spider|scraper").expect("valid bot pattern"),
            script_extension: Regex::new(r"(?i)\.(php|asp|jsp|cgi)$").expect("valid extension pattern"),
            admin_path: Regex::new(r"(?i)wp-admin|admin|login|phpmyadmin").expect("valid admin pattern"),
            sql: Regex::new(r#"(?i)['";]|union|select|insert|update|delete|drop"#).expect("valid sql pattern"),
            xss: Regex::new(r"(?i)<script|javascript:|onload=|onerror=").expect("valid xss pattern"),
        }
    }

    pub fn analyze(&self, request: &ShieldRequest) -> BehaviorReport {
        let mut indicators = Vec::new();
        let path = request.path.as_str();

        if request.user_agent().is_some_and(|ua| self.bot_agent.is_match(ua)) {
            indicators.push(Indicator::BotUserAgent);
        }
        if self.script_extension.is_match(path) {
            indicators.push(Indicator::ScriptExtension);
        }
        if self.admin_path.is_match(path) {
            indicators.push(Indicator::AdminPath);
        }
        if self.sql.is_match(path) {
            indicators.push(Indicator::SqlSignature);
        }
        if self.xss.is_match(path) {
            indicators.push(Indicator::XssSignature);
        }
        if request.header("accept").is_none() || request.user_agent().is_none() {
            indicators.push(Indicator::MissingHeaders);
        }

        BehaviorReport { indicators }
    }

    /// Number of indicators that fired.
    pub fn score(&self, request: &ShieldRequest) -> usize {
        self.analyze(request).score()
    }
}

impl Default for BehaviorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
