//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields (`ip`, `stage`, `reason`) on every decision log
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap and optional

pub mod logging;
pub mod metrics;
