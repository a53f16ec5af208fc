//! Manifest REST API handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::Uri,
    routing::get,
};
use tracing::debug;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::manifest::{self, Manifest};

/// Build the API router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/manifest", get(get_manifest))
        .fallback(not_found)
}

/// GET /api/v1/manifest - Expected assets and their availability
async fn get_manifest(State(state): State<Arc<AppState>>) -> Result<Json<Manifest>> {
    let manifest = manifest::build(&state.config, &state.scene).await?;
    debug!(
        "manifest: {} textures, {} missing",
        manifest.textures.len(),
        manifest.missing().count()
    );
    Ok(Json(manifest))
}

async fn not_found(uri: Uri) -> ServerError {
    ServerError::NotFound(uri.path().to_string())
}
