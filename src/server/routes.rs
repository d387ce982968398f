//! HTTP route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use crate::error::AppError;
use crate::mood::descriptor;
use crate::types::{HealthResponse, HealthStatus, MoodsResponse, PingResponse, ServiceStatus};

use super::extractors::ResponseFormat;
use super::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `MessagePack` response wrapper
pub struct MsgPack<T>(pub T);

impl<T: serde::Serialize> IntoResponse for MsgPack<T> {
    fn into_response(self) -> Response {
        match rmp_serde::to_vec_named(&self.0) {
            Ok(bytes) => (
                StatusCode::OK,
                [("content-type", "application/msgpack")],
                bytes,
            )
                .into_response(),
            Err(e) => AppError::Serialization(e.to_string()).into_response(),
        }
    }
}

/// Body rendered as JSON or `MessagePack` depending on the request's `Accept`
pub struct Negotiated<T> {
    pub format: ResponseFormat,
    pub body: T,
}

impl<T> Negotiated<T> {
    pub fn new(format: ResponseFormat, body: T) -> Self {
        Self { format, body }
    }
}

impl<T: serde::Serialize> IntoResponse for Negotiated<T> {
    fn into_response(self) -> Response {
        match self.format {
            ResponseFormat::Json => Json(self.body).into_response(),
            ResponseFormat::MsgPack => MsgPack(self.body).into_response(),
        }
    }
}

/// Liveness check
///
/// GET /ping
pub async fn ping(format: ResponseFormat) -> Negotiated<PingResponse> {
    Negotiated::new(
        format,
        PingResponse {
            message: "Art Therapy API is running!".to_string(),
            status: HealthStatus::Healthy,
            version: VERSION.to_string(),
        },
    )
}

/// Health check endpoint
///
/// GET /health
pub async fn health(State(state): State<AppState>, format: ResponseFormat) -> Negotiated<HealthResponse> {
    let ready = state.engines.is_ready();
    let status = if ready {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Negotiated::new(
        format,
        HealthResponse {
            status,
            services: ServiceStatus {
                mood_analyzer: ready,
                api: true,
            },
            engine: state.engines.kind(),
            timestamp: Utc::now(),
            uptime_seconds: state.uptime_seconds(),
        },
    )
}

/// Categories the configured engine can return
///
/// GET /moods
pub async fn moods(State(state): State<AppState>, format: ResponseFormat) -> Negotiated<MoodsResponse> {
    let moods = state.engines.available_moods().to_vec();
    let descriptions = moods
        .iter()
        .map(|mood| (mood.to_string(), descriptor(*mood).summary.to_string()))
        .collect();

    Negotiated::new(format, MoodsResponse { moods, descriptions })
}

/// Unknown routes
pub async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}
