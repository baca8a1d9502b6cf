use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /emojis — passthrough of the external emoji lookup API.
/// Unconfigured installs simply don't have the endpoint.
pub async fn list(State(state): State<AppState>) -> AppResult<Response> {
    let api_key = state
        .config
        .emoji
        .api_key
        .clone()
        .ok_or(AppError::NotFound)?;

    let emojis: serde_json::Value = state
        .http
        .get(&state.config.emoji.endpoint)
        .query(&[("access_key", api_key.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(Json(emojis).into_response())
}
