//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build Shield → Spawn maintenance → Serve
//!
//! Maintenance (maintenance.rs):
//!     metrics tick → Shield::tick_metrics
//!     cleanup tick → Shield::cleanup
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast → server drains, maintenance exits
//! ```
//!
//! # Design Decisions
//! - One broadcast channel reaches every long-running task
//! - Background work is a plain tokio task, cancelled by the broadcast

pub mod maintenance;
pub mod shutdown;
pub mod signals;

pub use maintenance::Maintenance;
pub use shutdown::Shutdown;
