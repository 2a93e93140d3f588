//! Request metadata the shield decides on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Everything the pipeline looks at for one inbound request.
///
/// Header names are compared case-insensitively; builders store them
/// lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShieldRequest {
    pub ip: String,
    pub user_agent: String,
    pub path: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Unix milliseconds, informational.
    pub timestamp: u64,
}

impl ShieldRequest {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            method: "GET".to_string(),
            path: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the user agent, mirrored into the `user-agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self.headers
            .insert("user-agent".to_string(), self.user_agent.clone());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// A browser-like request: user agent plus `accept` header.
    pub fn browser(ip: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(ip)
            .with_path(path)
            .with_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0")
            .with_header("accept", "text/html")
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// User agent from the explicit field, else the header.
    pub fn user_agent(&self) -> Option<&str> {
        if !self.user_agent.is_empty() {
            return Some(&self.user_agent);
        }
        self.header("user-agent").filter(|ua| !ua.is_empty())
    }

    /// Parsed client address, `None` when missing or malformed.
    pub fn client_ip(&self) -> Option<IpAddr> {
        self.ip.trim().parse().ok()
    }

    /// Declared body size from the explicit field, else `content-length`.
    pub fn declared_length(&self) -> Option<u64> {
        self.content_length.or_else(|| {
            self.header("content-length")
                .and_then(|value| value.trim().parse().ok())
        })
    }
}
