use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::db::models::{Post, User};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub posts: Vec<Post>,
    pub user: Option<User>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/error.html")]
pub struct ErrorTemplate;

#[derive(Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// GET / — the feed, newest posts first, readable without signing in
pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<ErrorQuery>,
) -> AppResult<Response> {
    let posts = state.posts.list_recent().await?;

    Ok(Html(HomeTemplate {
        posts,
        user: maybe_user.0,
        error: query.error,
    })
    .into_response())
}

/// GET /error — generic "something went wrong" page
pub async fn error_page() -> Response {
    Html(ErrorTemplate).into_response()
}
