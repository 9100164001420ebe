//! HTTP relay in front of the ML service and the Gemini API.
//!
//! The relay adds no logic of its own: requests are forwarded once, with
//! no retry and no timeout, and any failure comes back as a 500 with a
//! JSON `{"error": ...}` body.

pub mod error;
pub mod handlers;

pub use error::RelayError;

use crate::client::{ClientError, GeminiClient, MlClient};
use crate::config::Config;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest request body accepted, sized for CSV uploads.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub ml: MlClient,
    pub gemini: GeminiClient,
}

impl AppState {
    pub fn new(ml: MlClient, gemini: GeminiClient) -> Self {
        Self { ml, gemini }
    }

    /// Build the state from configuration, sharing one connection pool.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::new();
        let ml = MlClient::with_http(http.clone(), &config.ml.base_url)?;
        let gemini = GeminiClient::with_http(http, config.gemini.clone());
        Ok(Self::new(ml, gemini))
    }
}

/// Build the relay router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/tune", post(handlers::tune))
        .route("/upload-csv", post(handlers::upload_csv))
        .route(
            "/gemini/explain",
            get(handlers::explain_query).post(handlers::explain_body),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    if !state.gemini.has_api_key() {
        tracing::warn!("GEMINI_API_KEY is not set; /gemini/explain will answer 500");
    }
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Relay listening on http://{}", addr);
    info!("Forwarding to ML service at {}", config.ml.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
