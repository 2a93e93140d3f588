//! Request identification and conversion.
//!
//! # Responsibilities
//! - Assign a UUID request ID as early as possible for tracing
//! - Translate an inbound HTTP request into a [`ShieldRequest`]

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderName, HeaderValue, Request};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::shield::ShieldRequest;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of `request`, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Metadata of `request` as seen from the peer address in its extensions.
pub fn to_shield_request<B>(request: &Request<B>) -> ShieldRequest {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let user_agent = headers
        .get(header::USER_AGENT.as_str())
        .cloned()
        .unwrap_or_default();
    let content_length = headers
        .get(header::CONTENT_LENGTH.as_str())
        .and_then(|v| v.parse().ok());
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    ShieldRequest {
        ip,
        user_agent,
        path,
        method: request.method().to_string(),
        headers,
        content_length,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
    }
}
