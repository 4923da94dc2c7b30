//! Fanout HTTP Boundary
//!
//! Thin axum layer over the supervisor: a synchronous prompt endpoint, a
//! newline-delimited JSON streaming endpoint, liveness, and metrics.

pub mod config;
pub mod http;
pub mod metrics;
pub mod state;

pub use config::Config;
pub use state::AppState;
