//! Miro OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Miro.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use super::middleware::LOGIN_PATH;
use super::session::{SESSION_COOKIE, Session, sign_session_id, verify_session_cookie};
use crate::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::metrics::OAUTH_LOGINS_TOTAL;

/// Cookie holding the CSRF state between redirect and callback
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - GET /auth/miro - Redirect to Miro
/// - GET `auth.miro.redirect_path` - OAuth callback (default /auth/miro/callback)
/// - GET /logout - Logout
pub fn auth_router(config: &AuthConfig) -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page))
        .route("/auth/miro", get(miro_redirect))
        .route(&config.miro.redirect_path, get(miro_callback))
        .route("/logout", get(logout))
}

// =============================================================================
// Login Page
// =============================================================================

/// GET /login
///
/// Renders a simple login page with a Miro sign-in link.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - miroteams</title></head>
        <body>
            <h1>miroteams</h1>
            <p>Please sign in with Miro</p>
            <a href="/auth/miro">Sign in with Miro</a>
        </body>
        </html>
    "#,
    )
}

// =============================================================================
// Miro OAuth
// =============================================================================

/// GET /auth/miro
///
/// Redirects user to the Miro authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to Miro with client_id, redirect_uri, state
async fn miro_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let csrf_state = generate_csrf_state();
    let location = state.miro.authorize_url(&csrf_state)?;

    // Only the callback needs to read the state back
    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path(state.config.auth.miro.redirect_path.clone())
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS))
        .build();

    Ok((jar.add(cookie), Redirect::to(&location)))
}

/// Query parameters from the Miro callback
#[derive(Debug, Deserialize)]
struct MiroCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set when the user declined or Miro failed
    error: Option<String>,
    error_description: Option<String>,
}

/// GET `auth.miro.redirect_path`
///
/// Handles OAuth callback from Miro. Every failure ends on the login
/// page; no error body is ever returned.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch user and team from Miro
/// 4. Resolve the local principal
/// 5. Create session and set cookie
/// 6. Redirect to home
async fn miro_callback(
    State(state): State<AppState>,
    query: Result<Query<MiroCallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> impl IntoResponse {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(removal_cookie(
        OAUTH_STATE_COOKIE,
        state.config.auth.miro.redirect_path.clone(),
    ));

    let result = match query {
        Ok(Query(query)) => complete_login(&state, query, expected_state.as_deref()).await,
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    };

    match result.and_then(|session| session_cookie(&state, &session).map(|c| (session, c))) {
        Ok((session, cookie)) => {
            OAUTH_LOGINS_TOTAL.with_label_values(&["success"]).inc();
            tracing::info!(
                user_id = %session.principal.user_id,
                team_id = %session.principal.team_id,
                "Miro login succeeded"
            );
            (jar.add(cookie), Redirect::to("/"))
        }
        Err(error) => {
            OAUTH_LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            tracing::warn!(%error, kind = error.kind(), "Miro login failed");
            (jar, Redirect::to(LOGIN_PATH))
        }
    }
}

async fn complete_login(
    state: &AppState,
    query: MiroCallbackQuery,
    expected_state: Option<&str>,
) -> Result<Session, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::OAuth(format!(
            "authorization denied: {error} {}",
            query.error_description.unwrap_or_default()
        )));
    }

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Validation("code is missing in the callback".to_string()))?;

    let token = state.miro.exchange_code(&code).await?;
    let context = state.miro.fetch_token_context(&token.access_token).await?;
    let principal = state.teams.resolve_principal(&context).await?;

    let session = Session::new(principal, state.config.auth.session_max_age);
    state.sessions.insert(session.clone()).await?;

    Ok(session)
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Invalidates the server-side session, clears the cookie and redirects
/// to login.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(session_id) =
            verify_session_cookie(cookie.value(), &state.config.auth.session_secret)
        {
            match state.sessions.invalidate(&session_id).await {
                Ok(true) => tracing::info!("Session invalidated"),
                Ok(false) => tracing::debug!("Logout for unknown session"),
                Err(error) => tracing::error!(%error, "Failed to invalidate session"),
            }
        }
    }

    let jar = jar.remove(removal_cookie(SESSION_COOKIE, "/".to_string()));
    (jar, Redirect::to(LOGIN_PATH))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    use base64::Engine as _;
    use rand::RngCore;

    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), AppError> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn session_cookie(state: &AppState, session: &Session) -> Result<Cookie<'static>, AppError> {
    let value = sign_session_id(&session.id, &state.config.auth.session_secret)?;

    Ok(Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(state.config.auth.session_max_age))
        .build())
}

fn removal_cookie(name: &'static str, path: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path(path).http_only(true).build();
    cookie.make_removal();
    cookie
}
