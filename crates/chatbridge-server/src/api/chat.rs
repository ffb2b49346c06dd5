use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use chatbridge_ai::Message;
use futures::StreamExt;
use serde::Deserialize;

use crate::api::{ErrorDetail, state::AppState};
use crate::relay::relay_events;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Absent and empty are both rejected with 400, not a serde error.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<Message>>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorDetail>)> {
    // Reject before any upstream work; past this point every failure is
    // reported inside the event stream.
    let message = request.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorDetail::new("Message cannot be empty")),
        ));
    }

    let config = state.ollama.as_ref().clone();
    let stream = relay_events(
        config,
        request.history.unwrap_or_default(),
        request.custom_instructions,
        message,
    )
    .map(|event| Ok::<_, Infallible>(Event::default().json_data(&event).unwrap()));

    // Keep intermediaries from caching or buffering the stream.
    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    Ok((headers, Sse::new(stream)))
}
