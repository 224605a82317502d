//! Axum HTTP API server.
//!
//! Thin handlers over the orchestrator: every long-running operation
//! creates a job record, enqueues its payload and returns the job id for
//! polling.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
