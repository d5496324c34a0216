use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness: the process is up, whether or not a model could be loaded.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "classifier-service",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.classifier.is_some()
    }))
}

/// Readiness: only ready to take traffic with a model in memory.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.classifier {
        Some(_) => StatusCode::OK,
        None => StatusCode::SERVICE_UNAVAILABLE,
    }
}
