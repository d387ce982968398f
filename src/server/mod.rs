//! HTTP server setup and routing.

mod engine;
mod extractors;
mod predict;
mod routes;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::auth::{AuthError, StaticTokenVerifier, TokenVerifier};
use crate::config::{AppConfig, CorsConfig};
use crate::inference::EncoderLoader;

pub use engine::EngineProvider;
pub use extractors::{AuthUser, ResponseFormat};
pub use routes::{MsgPack, Negotiated};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engines: EngineProvider,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Server start time for uptime calculation
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        loader: Arc<dyn EncoderLoader>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            engines: EngineProvider::new(config.engine.kind, loader),
            config: Arc::new(config),
            verifier,
            started_at: Instant::now(),
        }
    }

    /// State with a [`StaticTokenVerifier`] built from `auth.dev_tokens`
    pub fn from_config(config: AppConfig, loader: Arc<dyn EncoderLoader>) -> Result<Self, AuthError> {
        let verifier = StaticTokenVerifier::from_entries(&config.auth.dev_tokens)?;
        if config.auth.required && verifier.is_empty() {
            warn!("Authentication is required but no tokens are configured; /predict will reject every request");
        }
        Ok(Self::new(config, loader, Arc::new(verifier)))
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Creates the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);
    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);

    Router::new()
        .route("/ping", get(routes::ping))
        .route("/health", get(routes::health))
        .route("/moods", get(routes::moods))
        .route("/predict", post(predict::predict))
        .fallback(routes::not_found)
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
