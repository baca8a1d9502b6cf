use axum::routing::get;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/auth/provider", get(handlers::provider_login))
        .route("/auth/provider/callback", get(handlers::provider_callback))
        .route(
            "/auth/username",
            get(handlers::pick_username_page).post(handlers::pick_username),
        )
}
