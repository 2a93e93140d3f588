//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request metadata:
//!     → access_control.rs (whitelist / blacklist membership)
//!     → rate_limit.rs (fixed-window admission per IP)
//!     → reputation.rs (adaptive trust score, seeded by collaborators)
//!     → behavior.rs (bot, scanner and injection heuristics)
//!     → geo.rs (country allow-list)
//!     → content.rs (traversal, injection and size signatures)
//! ```
//!
//! # Design Decisions
//! - Cheap checks first; every stage can short-circuit
//! - Collaborator failures degrade to neutral values, never to errors
//! - All per-IP state is bounded (LRU + TTL, or idle cleanup)

pub mod access_control;
pub mod behavior;
pub mod cache;
pub mod content;
pub mod geo;
pub mod rate_limit;
pub mod reputation;

pub use access_control::{AccessList, ListKind};
pub use behavior::{BehaviorAnalyzer, BehaviorReport, Indicator};
pub use content::{ContentInspector, Finding};
pub use geo::{GeoPolicy, GeoVerdict};
pub use rate_limit::{Admission, RateLimiter};
pub use reputation::{IpReputation, ReputationEvent, ReputationStore, Standing};
