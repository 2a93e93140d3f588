//! Authenticated admin API.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/whitelist/{ip}", post(add_whitelist).delete(remove_whitelist))
        .route("/admin/blacklist/{ip}", post(add_blacklist).delete(remove_blacklist))
        .route("/admin/reputation/{ip}", get(get_reputation))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
