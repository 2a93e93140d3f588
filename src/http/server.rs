//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Decision endpoint for an external proxy (`POST /v1/validate`)
//! - Liveness endpoint (`GET /healthz`)
//! - Admin API, when enabled
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve until the shutdown broadcast fires

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::shield::{Decision, Shield, ShieldRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub shield: Arc<Shield>,
}

/// HTTP front end of a [`Shield`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(shield: Arc<Shield>) -> Self {
        Self {
            router: Self::build_router(shield),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(shield: Arc<Shield>) -> Router {
        let config = shield.config();
        let request_timeout = Duration::from_secs(config.listener.request_timeout_secs);
        let admin_enabled = config.admin.enabled;
        let state = AppState { shield };

        let mut router = Router::new()
            .route("/v1/validate", post(validate_handler))
            .route("/healthz", get(health_handler))
            .with_state(state.clone());

        if admin_enabled {
            router = router.merge(admin::setup_admin_router(state));
        }

        router
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Decide on a request described by an external proxy.
async fn validate_handler(
    State(state): State<AppState>,
    Json(request): Json<ShieldRequest>,
) -> Json<Decision> {
    Json(state.shield.validate(&request).await)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
