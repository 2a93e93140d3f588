//! Middleware applied around handlers.

pub mod shield;

pub use shield::shield_middleware;
