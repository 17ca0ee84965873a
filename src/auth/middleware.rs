//! Session guard
//!
//! Protects routes that require an authenticated session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, verify_session_cookie};
use crate::AppState;
use crate::error::AppError;

/// Where unauthenticated browsers are sent
pub const LOGIN_PATH: &str = "/login";

/// Outcome of the session guard
#[derive(Debug, Clone)]
pub enum Access {
    Allow(Session),
    Deny,
}

/// Decide whether request-attached session state grants access.
///
/// `Allow` iff a session is present and not expired. No side effects.
pub fn ensure_authenticated(session: Option<Session>) -> Access {
    match session {
        Some(session) if !session.is_expired() => Access::Allow(session),
        _ => Access::Deny,
    }
}

/// Resolve the session referenced by the request's `session` cookie.
///
/// Missing, forged or unknown cookies yield `None`; only store failures
/// are errors.
pub async fn load_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<Session>, AppError> {
    let jar = CookieJar::from_headers(headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let session_id = match verify_session_cookie(cookie.value(), &state.config.auth.session_secret)
    {
        Ok(id) => id,
        Err(_) => {
            tracing::debug!("Ignoring session cookie with invalid signature");
            return Ok(None);
        }
    };

    state.sessions.get(&session_id).await
}

/// Middleware to require an authenticated session
///
/// Adds the Session to request extensions when allowed; otherwise
/// redirects to the login page.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/some_protected_route", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match load_session(request.headers(), &state).await {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    match ensure_authenticated(session) {
        Access::Allow(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Access::Deny => {
            tracing::debug!(path = %request.uri().path(), "No session; redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// Extractor for the current authenticated session
///
/// Use in handlers behind [`require_session`], or standalone; a request
/// without a valid session is rejected with 401.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentSession(session));
        }

        let state = AppState::from_ref(state);
        match ensure_authenticated(load_session(&parts.headers, &state).await?) {
            Access::Allow(session) => {
                parts.extensions.insert(session.clone());
                Ok(CurrentSession(session))
            }
            Access::Deny => Err(AppError::Unauthorized),
        }
    }
}

/// Optional session extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeSession(Some(session)));
        }

        let state = AppState::from_ref(state);
        let session = match load_session(&parts.headers, &state).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%error, "Session lookup failed");
                None
            }
        };

        match ensure_authenticated(session) {
            Access::Allow(session) => {
                parts.extensions.insert(session.clone());
                Ok(MaybeSession(Some(session)))
            }
            Access::Deny => Ok(MaybeSession(None)),
        }
    }
}
