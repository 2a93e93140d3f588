//! HTTP responses for refused requests.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::shield::{Action, Decision};

pub const X_SHIELD_CHALLENGE: HeaderName = HeaderName::from_static("x-shield-challenge");

/// Response for a decision that did not allow the request.
///
/// Tarpit delays must already have been served by the caller.
pub fn refusal(decision: &Decision) -> Response {
    let reason = decision.reason.as_deref().unwrap_or("request denied");
    let body = Json(json!({
        "error": reason,
        "action": decision.action,
    }));

    match decision.action {
        Action::Captcha => (
            StatusCode::FORBIDDEN,
            [(X_SHIELD_CHALLENGE, HeaderValue::from_static("captcha"))],
            body,
        )
            .into_response(),
        Action::Tarpit => {
            let retry_after = decision
                .delay()
                .map(|d| d.as_secs_f64().ceil() as u64)
                .unwrap_or(1)
                .max(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, HeaderValue::from(retry_after))],
                body,
            )
                .into_response()
        }
        Action::Block | Action::Allow => (StatusCode::FORBIDDEN, body).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let response = refusal(&Decision::block("IP blacklisted"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = refusal(&Decision::captcha("suspicious IP reputation"));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()[&X_SHIELD_CHALLENGE], "captcha");

        let response = refusal(&Decision::tarpit("rate limit exceeded", Duration::from_millis(1500)));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
