//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → POST /v1/validate: JSON ShieldRequest → Shield::validate → JSON Decision
//!     → /admin/*: admin module (bearer token)
//!
//! Embedded use:
//!     → middleware/shield.rs wraps any router
//!     → request.rs (HTTP request → ShieldRequest)
//!     → response.rs (refused Decision → 403 / 429)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::shield_middleware;
pub use request::{to_shield_request, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
