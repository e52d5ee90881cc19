//! Axum HTTP API for PlayCoach.
//!
//! This crate provides:
//! - Video upload with background analysis through the shared pipeline
//! - Ledger lookups for processed videos and their critiques
//! - Per-session Gemini API keys behind a signed cookie
//! - Health probes, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::{SessionStore, SESSION_COOKIE};
pub use state::{AppState, GeminiServiceFactory, ServiceFactory};
