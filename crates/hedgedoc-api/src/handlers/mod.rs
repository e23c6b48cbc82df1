//! HTTP handlers.

pub mod history;
pub mod me;
pub mod media;
pub mod notes;

use axum::{response::IntoResponse, Json};

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
