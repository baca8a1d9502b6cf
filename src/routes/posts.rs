use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::db::models::{Post, User};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostDetailTemplate {
    pub post: Post,
    pub user: Option<User>,
}

#[derive(Deserialize)]
pub struct NewPostForm {
    pub title: String,
    pub content: String,
}

/// GET /post/{id} — post detail page
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let Some(post) = state.posts.find_by_id(id).await? else {
        return Ok(Redirect::to("/error").into_response());
    };

    Ok(Html(PostDetailTemplate {
        post,
        user: maybe_user.0,
    })
    .into_response())
}

/// POST /posts — create a post as the signed-in user
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    axum::Form(form): axum::Form<NewPostForm>,
) -> AppResult<Response> {
    let title = form.title.trim();
    let content = form.content.trim();
    if title.is_empty() || content.is_empty() {
        return Ok(Redirect::to("/?error=Title%20and%20content%20are%20required").into_response());
    }

    let post = state.posts.create(title, content, &user.username).await?;
    tracing::debug!("Post {} created by {}", post.id, user.username);

    Ok(Redirect::to("/").into_response())
}

/// POST /like/{id} — anyone may like a post, signed in or not
pub async fn like(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Response> {
    match state.posts.increment_likes(id).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(StoreError::NotFound) => Ok(Redirect::to("/error").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// POST /delete/{id} — owner-only delete
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let deleted = state.posts.delete_owned(id, &user.username).await?;

    if deleted {
        Ok(Redirect::to("/").into_response())
    } else {
        // Deliberately the same answer for "no such post" and "not yours"
        Ok((
            StatusCode::NOT_FOUND,
            "Post not found or not authorized to delete",
        )
            .into_response())
    }
}
