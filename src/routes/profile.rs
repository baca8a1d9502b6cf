use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::db::models::{Post, User};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::routes::home::Html;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub user: User,
    pub posts: Vec<Post>,
}

/// GET /profile — the signed-in user's own posts
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let posts = state.posts.list_by_author(&user.username).await?;

    Ok(Html(ProfileTemplate { user, posts }).into_response())
}
