//! Art Mood - Entry Point

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use art_mood::inference::{self, EncoderLoader, KnownModel};
use art_mood::{config::AppConfig, server, EngineKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Art Mood API");

    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config from environment: {e}, using defaults");
        AppConfig::default()
    });

    info!(
        engine = %config.engine.kind,
        model = %config.model.name,
        cuda = config.model.enable_cuda,
        auth_required = config.auth.required,
        "Configuration loaded"
    );

    if config.engine.kind == EngineKind::Embedding && !KnownModel::is_known(&config.model.name) {
        warn!(model = %config.model.name, "Model is not a known CLIP export, loading may fail");
    }

    let state = server::AppState::from_config(config.clone(), encoder_loader(&config))
        .context("Invalid auth configuration")?;

    if config.engine.kind == EngineKind::Embedding && config.engine.preload {
        info!("Preloading embedding engine");
        if let Err(e) = state.engines.embedding().await {
            error!(error = %e, "Embedding engine preload failed, will retry on first request");
        }
    }

    // Create router
    let app = server::create_router(state);

    // Bind to socket
    let addr = config
        .server
        .socket_addr()
        .context("Invalid server host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(%addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "inference")]
fn encoder_loader(config: &AppConfig) -> Arc<dyn EncoderLoader> {
    Arc::new(inference::ClipLoader::new(&config.model))
}

#[cfg(not(feature = "inference"))]
fn encoder_loader(config: &AppConfig) -> Arc<dyn EncoderLoader> {
    if config.engine.kind == EngineKind::Embedding {
        warn!("Built without the `inference` feature; the embedding engine is unavailable");
    }
    Arc::new(inference::UnavailableLoader)
}

/// Initialize the tracing subscriber for logging
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "art_mood=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
