//! Spotlight stage server
//!
//! Hosts the wasm viewer page together with the textures and mesh it loads.

mod api;
mod config;
mod error;
mod manifest;

use std::sync::Arc;

use axum::{Router, routing::get};
use clap::Parser;
use spotlight_stage::config::SceneConfig;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub scene: SceneConfig,
}

fn app(state: Arc<AppState>) -> Router {
    let config = &state.config;
    Router::new()
        .route("/", get(api::portal::index))
        .nest("/api/v1", api::manifest::router())
        .nest_service("/textures", ServeDir::new(config.textures_dir()))
        .nest_service("/models", ServeDir::new(config.models_dir()))
        .nest_service("/wasm", ServeDir::new(&config.wasm_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stage_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::parse();
    info!("Starting stage-server on {}:{}", config.host, config.port);

    let scene = SceneConfig::default();
    let manifest = manifest::build(&config, &scene).await?;
    for entry in manifest.missing() {
        warn!(
            "{} is not under {}; the viewer will render without it",
            entry.url,
            config.asset_dir.display()
        );
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { config, scene });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
