//! HTTP API handlers

pub mod chat;
pub mod response;
pub mod state;

pub use response::ErrorDetail;

use axum::{Json, extract::State};
use serde::Serialize;

use state::AppState;

#[derive(Serialize)]
pub struct ServiceStatus {
    status: String,
    service: String,
    backend_url: String,
    model: String,
}

// GET /
pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "online".to_string(),
        service: "ChatBridge API".to_string(),
        backend_url: state.ollama.base_url.clone(),
        model: state.ollama.model.clone(),
    })
}
