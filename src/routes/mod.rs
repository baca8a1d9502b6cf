pub mod auth;
pub mod avatar;
pub mod emoji;
pub mod home;
pub mod posts;
pub mod profile;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router. Lives here so integration tests can
/// drive the same wiring the binary serves.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/error", get(home::error_page))
        .route("/post/{id}", get(posts::detail))
        .route("/posts", post(posts::create))
        .route("/like/{id}", post(posts::like))
        .route("/delete/{id}", post(posts::delete))
        .route("/profile", get(profile::show))
        .route("/avatar/{username}", get(avatar::serve))
        .route("/emojis", get(emoji::list))
        .merge(auth::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
