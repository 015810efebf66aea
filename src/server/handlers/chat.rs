use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: Option<String>,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = payload.query.unwrap_or_default();
    let response = state.answer.ask(&query).await?;
    Ok(Json(response))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.answer.clear().await?;
    Ok(Json(json!({
        "message": "Chat history cleared",
        "history": []
    })))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.answer.history().await?;
    Ok(Json(json!({ "history": history })))
}
