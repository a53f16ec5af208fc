//! Viewer page handler

use axum::response::{Html, IntoResponse};

/// GET / - Viewer page
pub async fn index() -> impl IntoResponse {
    let html = include_str!("../../static/index.html");
    Html(html)
}
