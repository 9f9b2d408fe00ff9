//! Axum-based HTTP front door for the panel pipeline.
//!
//! Exposes the three pipeline stages as JSON endpoints plus a health probe:
//!
//! - `GET  /` - health probe
//! - `POST /api/evaluate` - one persona judges one uploaded photo (multipart)
//! - `POST /api/combine` - merge evaluation results into a directive (JSON)
//! - `POST /api/generate` - request revised photos for a directive (multipart)
//!
//! The server is a thin wrapper: it decodes uploads, resolves the API key,
//! and maps pipeline failures to JSON error responses. Requests are
//! body-limited and time-boxed; CORS is wide open because the expected
//! caller is a browser frontend served from elsewhere.

mod handlers;

use handlers::{handle_combine, handle_evaluate, handle_generate, handle_health};

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (16MB), sized for the largest photo upload.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;
/// Request timeout (120s), long enough for a fan-out of generation calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared state for all axum handlers.
///
/// Holds only the connection pool; every request builds its own model
/// client because the credential may arrive per-request.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the application router with all routes and middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_health))
        .route("/api/evaluate", post(handle_evaluate))
        .route("/api/combine", post(handle_combine))
        .route("/api/generate", post(handle_generate))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP server on the given host and port.
pub async fn run_server(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_server_with_listener(listener).await
}

/// Run the HTTP server from a pre-bound listener.
pub async fn run_server_with_listener(listener: tokio::net::TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "panel server listening");

    let app = router(AppState::new());
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_fits_photo_uploads() {
        assert_eq!(MAX_BODY_SIZE, 16_777_216);
    }

    #[test]
    fn test_request_timeout_outlasts_upstream_calls() {
        assert_eq!(REQUEST_TIMEOUT_SECS, 120);
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_router_builds() {
        let _app = router(AppState::new());
    }
}
