//! Shield middleware for axum routers.
//!
//! Wraps any router so every request passes through [`Shield::validate`]
//! before reaching a handler. Tarpitted requests wait inside the response
//! future; a client that disconnects drops the wait with it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::http::request::{request_id, to_shield_request};
use crate::http::response::refusal;
use crate::shield::{Action, Shield};

pub async fn shield_middleware(
    State(shield): State<Arc<Shield>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let shield_request = to_shield_request(&request);
    let decision = shield.validate(&shield_request).await;

    if decision.allowed {
        return next.run(request).await;
    }

    tracing::debug!(
        request_id = %request_id(&request),
        action = decision.action.as_str(),
        "Refusing request"
    );
    if decision.action == Action::Tarpit {
        if let Some(delay) = decision.delay() {
            tokio::time::sleep(delay).await;
        }
    }
    refusal(&decision)
}
