use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_api_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub prompt: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Liveness probe; unauthenticated.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "message": "Secure API is running"
    }))
}

/// Thin adapter: authenticate, then hand the question to the engine.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    require_api_token(&headers, &state.api_token)?;

    let conversation_id = payload.conversation_id.as_deref().unwrap_or("default");
    let answer = state.engine.answer(conversation_id, &payload.prompt).await?;

    Ok(Json(json!({ "answer": answer })))
}
