use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use corkboard::config::Config;
use corkboard::db;
use corkboard::state::AppState;

fn test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).unwrap();
    db::run_migrations(&pool).unwrap();

    let state = AppState::build(Config::default(), pool).unwrap();
    (corkboard::routes::router(state), temp_dir)
}

fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Pull the `corkboard_session=...` pair out of a Set-Cookie header.
fn session_cookie(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("expected a session cookie")
        .to_str()
        .unwrap();
    set_cookie
        .split(';')
        .next()
        .unwrap()
        .trim()
        .to_string()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Register a user and hand back their session cookie.
async fn register(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(form_request(
            "/register",
            &format!("username={}", username),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
    session_cookie(&response)
}

#[tokio::test]
async fn register_post_like_delete_roundtrip() {
    let (app, _temp) = test_app();

    let cookie = register(&app, "alice").await;

    // Home shows the compose form once signed in
    let response = app
        .clone()
        .oneshot(get_request("/", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("alice"));
    assert!(body.contains("/posts"));

    // Create a post
    let response = app
        .clone()
        .oneshot(form_request(
            "/posts",
            "title=Hi&content=there",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // It leads the feed, authored by alice, with zero likes
    let response = app.clone().oneshot(get_request("/", None)).await.unwrap();
    let body = body_string(response).await;
    assert!(body.contains("Hi"));
    assert!(body.contains("there"));
    assert!(body.contains("alice"));
    assert!(body.contains("0 likes"));

    // Anyone can like it, signed in or not
    let response = app
        .clone()
        .oneshot(form_request("/like/1", "", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.clone().oneshot(get_request("/", None)).await.unwrap();
    assert!(body_string(response).await.contains("1 likes"));

    // A different user cannot delete it
    let bob = register(&app, "bob").await;
    let response = app
        .clone()
        .oneshot(form_request("/delete/1", "", Some(&bob)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get_request("/", None)).await.unwrap();
    assert!(body_string(response).await.contains("Hi"));

    // The owner can
    let response = app
        .clone()
        .oneshot(form_request("/delete/1", "", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.clone().oneshot(get_request("/", None)).await.unwrap();
    assert!(!body_string(response).await.contains("Hi"));
}

#[tokio::test]
async fn duplicate_username_bounces_back_to_register() {
    let (app, _temp) = test_app();

    register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(form_request("/register", "username=alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/register?error="));
}

#[tokio::test]
async fn login_roundtrip_and_unknown_user() {
    let (app, _temp) = test_app();

    register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(form_request("/login", "username=alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(get_request("/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(form_request("/login", "username=ghost", None))
        .await
        .unwrap();
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/login?error="));
}

#[tokio::test]
async fn profile_requires_authentication() {
    let (app, _temp) = test_app();

    let response = app.clone().oneshot(get_request("/profile", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn posting_requires_authentication() {
    let (app, _temp) = test_app();

    let response = app
        .clone()
        .oneshot(form_request("/posts", "title=Hi&content=there", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (app, _temp) = test_app();

    let cookie = register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(get_request("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");

    // The old cookie no longer works
    let response = app
        .clone()
        .oneshot(get_request("/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn liking_a_missing_post_redirects_to_error() {
    let (app, _temp) = test_app();

    let response = app
        .clone()
        .oneshot(form_request("/like/999", "", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/error");
}

#[tokio::test]
async fn avatar_serves_png_for_known_users_only() {
    let (app, _temp) = test_app();

    register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(get_request("/avatar/alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

    let response = app
        .clone()
        .oneshot(get_request("/avatar/ghost", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get_request("/avatar/alice?w=0&h=50", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_detail_shows_post_or_error_redirect() {
    let (app, _temp) = test_app();

    let cookie = register(&app, "alice").await;
    app.clone()
        .oneshot(form_request(
            "/posts",
            "title=Hello&content=world",
            Some(&cookie),
        ))
        .await
        .unwrap();

    let response = app.clone().oneshot(get_request("/post/1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Hello"));
    assert!(body.contains("world"));

    let response = app.clone().oneshot(get_request("/post/999", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/error");
}

#[tokio::test]
async fn empty_post_bounces_back_with_error() {
    let (app, _temp) = test_app();

    let cookie = register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(form_request("/posts", "title=&content=", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/?error="));
}
