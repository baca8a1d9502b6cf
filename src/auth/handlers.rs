use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use rand::Rng;
use serde::Deserialize;

use crate::auth::provider::identity_hash;
use crate::auth::session::SessionState;
use crate::error::{AppError, AppResult};
use crate::extractors::session_token;
use crate::routes::home::Html;
use crate::state::AppState;
use crate::store::StoreError;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub login_error: Option<String>,
    pub register_error: Option<String>,
    pub provider_enabled: bool,
}

#[derive(Template)]
#[template(path = "pages/pick_username.html")]
pub struct PickUsernameTemplate {
    pub error: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

#[derive(Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// Random nonce echoed back by the provider callback.
fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// The caller's live session, if the cookie names one.
async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<(String, SessionState)> {
    let token = session_token(headers, &state.config.auth.cookie_name)?;
    let sessions = state.sessions.lock().await;
    let session = sessions.get(token)?;
    Some((token.to_string(), session))
}

/// Existing session or a fresh Anonymous one.
async fn current_or_new_session(state: &AppState, headers: &HeaderMap) -> (String, SessionState) {
    if let Some(found) = current_session(state, headers).await {
        return found;
    }
    let mut sessions = state.sessions.lock().await;
    let token = sessions.create();
    (token, SessionState::Anonymous)
}

/// Where to send a visitor whose session is mid-flow elsewhere.
fn resume_redirect(session: &SessionState) -> Response {
    match session {
        SessionState::Authenticated { .. } => Redirect::to("/").into_response(),
        SessionState::NeedsUsername { .. } => Redirect::to("/auth/username").into_response(),
        _ => Redirect::to("/login").into_response(),
    }
}

// -- Local flows --

/// GET /register — combined login/register page (register-side error)
pub async fn register_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> AppResult<Response> {
    Ok(Html(LoginTemplate {
        login_error: None,
        register_error: query.error,
        provider_enabled: state.provider.is_some(),
    })
    .into_response())
}

/// GET /login — combined login/register page (login-side error)
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> AppResult<Response> {
    Ok(Html(LoginTemplate {
        login_error: query.error,
        register_error: None,
        provider_enabled: state.provider.is_some(),
    })
    .into_response())
}

/// POST /register — claim a username and sign the new user in
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<UsernameForm>,
) -> AppResult<Response> {
    let username = form.username.trim().to_string();
    if username.is_empty() {
        return Ok(Redirect::to("/register?error=Username%20is%20required").into_response());
    }

    let (token, session) = current_or_new_session(&state, &headers).await;
    let claiming = match session.clone().begin_claim(username.clone()) {
        Ok(s) => s,
        Err(_) => return Ok(resume_redirect(&session)),
    };

    match state.users.create(&username, None).await {
        Ok(user) => {
            let authenticated = claiming.claim_granted(user.id)?;
            let mut sessions = state.sessions.lock().await;
            sessions.set(&token, authenticated);
            drop(sessions);

            tracing::info!("Username {} claimed by user {}", username, user.id);
            Ok((
                AppendHeaders([(
                    header::SET_COOKIE,
                    session_cookie(
                        &state.config.auth.cookie_name,
                        &token,
                        state.config.auth.session_hours,
                    ),
                )]),
                Redirect::to("/"),
            )
                .into_response())
        }
        Err(StoreError::Conflict(_)) => {
            // Claim falls through; the visitor stays anonymous
            let mut sessions = state.sessions.lock().await;
            sessions.set(&token, claiming.claim_rejected()?);
            drop(sessions);

            Ok(Redirect::to("/register?error=Username%20already%20taken").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /login — sign in an existing local user by username
pub async fn login(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<UsernameForm>,
) -> AppResult<Response> {
    let username = form.username.trim().to_string();

    let Some(user) = state.users.find_by_username(&username).await? else {
        return Ok(Redirect::to("/login?error=User%20not%20found").into_response());
    };

    // Every login starts a fresh session
    let token = {
        let mut sessions = state.sessions.lock().await;
        let token = sessions.create();
        sessions.set(&token, SessionState::Anonymous.login_granted(user.id)?);
        token
    };

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Redirect::to("/"),
    )
        .into_response())
}

/// GET /logout — destroy the session, converging both login flows
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = session_token(&headers, &state.config.auth.cookie_name) {
        let mut sessions = state.sessions.lock().await;
        sessions.destroy(token);
    }

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )]),
        Redirect::to("/login"),
    )
        .into_response())
}

// -- Delegated flow --

/// GET /auth/provider — hand the browser to the identity provider
pub async fn provider_login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let provider = state.provider.clone().ok_or(AppError::NotFound)?;

    let (token, session) = current_or_new_session(&state, &headers).await;
    let nonce = generate_nonce();
    let pending = match session.clone().begin_provider_login(nonce.clone()) {
        Ok(s) => s,
        Err(_) => return Ok(resume_redirect(&session)),
    };

    {
        let mut sessions = state.sessions.lock().await;
        sessions.set(&token, pending);
    }

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(
                &state.config.auth.cookie_name,
                &token,
                state.config.auth.session_hours,
            ),
        )]),
        Redirect::to(&provider.authorize_url(&nonce)),
    )
        .into_response())
}

/// GET /auth/provider/callback — the provider sent the browser back
pub async fn provider_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    let provider = state.provider.clone().ok_or(AppError::NotFound)?;

    let (token, session) = current_session(&state, &headers)
        .await
        .ok_or(AppError::Unauthorized)?;

    let subject = provider.fetch_subject(&query.code).await?;
    let hash = identity_hash(&subject);

    match state.users.find_by_identity_hash(&hash).await? {
        Some(user) => {
            let authenticated = session.provider_matched(&query.state, user.id)?;
            let mut sessions = state.sessions.lock().await;
            sessions.set(&token, authenticated);

            tracing::info!("User {} signed in via identity provider", user.id);
            Ok(Redirect::to("/").into_response())
        }
        None => {
            // First visit with this identity: ask for a username
            let needs_username = session.provider_unmatched(&query.state, hash)?;
            let mut sessions = state.sessions.lock().await;
            sessions.set(&token, needs_username);

            Ok(Redirect::to("/auth/username").into_response())
        }
    }
}

/// GET /auth/username — ask the new delegated identity for a username
pub async fn pick_username_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ErrorQuery>,
) -> AppResult<Response> {
    let Some((_, session)) = current_session(&state, &headers).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    if session.pending_identity().is_none() {
        return Ok(resume_redirect(&session));
    }

    Ok(Html(PickUsernameTemplate { error: query.error }).into_response())
}

/// POST /auth/username — finish delegated signup
pub async fn pick_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    axum::Form(form): axum::Form<UsernameForm>,
) -> AppResult<Response> {
    let (token, session) = current_session(&state, &headers)
        .await
        .ok_or(AppError::Unauthorized)?;

    let Some(hash) = session.pending_identity().map(str::to_string) else {
        return Ok(resume_redirect(&session));
    };

    let username = form.username.trim().to_string();
    if username.is_empty() {
        return Ok(Redirect::to("/auth/username?error=Username%20is%20required").into_response());
    }

    match state.users.create(&username, Some(&hash)).await {
        Ok(user) => {
            let authenticated = session.signup_granted(user.id)?;
            let mut sessions = state.sessions.lock().await;
            sessions.set(&token, authenticated);

            tracing::info!("Username {} claimed for delegated identity", username);
            Ok(Redirect::to("/").into_response())
        }
        // Conflict keeps the session waiting on a username
        Err(StoreError::Conflict(_)) => {
            Ok(Redirect::to("/auth/username?error=Username%20already%20taken").into_response())
        }
        Err(e) => Err(e.into()),
    }
}
