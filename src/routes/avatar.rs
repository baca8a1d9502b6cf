use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::avatar;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SizeQuery {
    pub w: Option<u32>,
    pub h: Option<u32>,
}

/// GET /avatar/{username} — stored avatar if the user has one, otherwise
/// a generated initial-letter PNG
pub async fn serve(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(size): Query<SizeQuery>,
) -> AppResult<Response> {
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(ref avatar_ref) = user.avatar_ref {
        let bytes = tokio::fs::read(avatar_ref)
            .await
            .map_err(|_| AppError::NotFound)?;
        return Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response());
    }

    let letter = user.username.chars().next().unwrap_or('U');
    let bytes = avatar::generate(letter, size.w.unwrap_or(50), size.h.unwrap_or(50))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
