//! Payload and path signature scanning.

use regex::Regex;
use std::fmt;

use crate::shield::ShieldRequest;

/// What the inspector found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Traversal,
    CommandInjection,
    SqlInjection,
    Oversized { declared: u64, limit: u64 },
    DangerousExtension,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Traversal => f.write_str("directory traversal"),
            Finding::CommandInjection => f.write_str("command injection pattern"),
            Finding::SqlInjection => f.write_str("sql injection pattern"),
            Finding::Oversized { declared, limit } => {
                write!(f, "content length {} exceeds {}", declared, limit)
            }
            Finding::DangerousExtension => f.write_str("dangerous file extension"),
        }
    }
}

pub struct ContentInspector {
    max_content_length: u64,
    command: Regex,
    sql: Regex,
    extension: Regex,
}

impl ContentInspector {
    pub fn new(max_content_length: u64) -> Self {
        Self {
            max_content_length,
            command: Regex::new(r"&&|;|`|\$\(").expect("valid command pattern"),
            sql: Regex::new(
                r"(?i)union(\s|\+|%20)+(all(\s|\+|%20)+)?select|(\s|\+|%20|')or(\s|\+|%20)+1=1|drop(\s|\+|%20)+table",
            )
            .expect("valid sql pattern"),
            extension: Regex::new(r"(?i)\.(exe|bat|sh|ps1|dll)$").expect("valid extension pattern"),
        }
    }

    /// First finding for `request`, in severity order.
    pub fn inspect(&self, request: &ShieldRequest) -> Option<Finding> {
        let path = request.path.as_str();

        if path.contains("..") {
            return Some(Finding::Traversal);
        }
        if self.sql.is_match(path) {
            return Some(Finding::SqlInjection);
        }
        if self.command.is_match(path) {
            return Some(Finding::CommandInjection);
        }
        if let Some(declared) = request.declared_length() {
            if declared > self.max_content_length {
                return Some(Finding::Oversized {
                    declared,
                    limit: self.max_content_length,
                });
            }
        }
        if self.extension.is_match(path) {
            return Some(Finding::DangerousExtension);
        }
        None
    }
}
