//! Axum HTTP API for audio analysis.
//!
//! This crate provides:
//! - `POST /v1/audio/analyze` backed by the cached analysis pipeline
//! - Liveness and readiness probes
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{AnalyzerConfig, ApiConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{AnalysisError, AudioAnalyzer};
pub use state::AppState;
