//! Browser-facing pages

use axum::{
    Router, middleware,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::{CurrentSession, MaybeSession, require_session};
use crate::error::AppError;

/// Create page router
///
/// Routes:
/// - GET / - Landing page
/// - GET /some_protected_route - Requires a session
pub fn pages_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/some_protected_route", get(some_protected_route))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new().route("/", get(home)).merge(protected)
}

/// GET /
///
/// Where a successful Miro login lands.
async fn home(MaybeSession(session): MaybeSession) -> impl IntoResponse {
    let body = match session {
        Some(session) => {
            let who = session
                .principal
                .name
                .as_deref()
                .unwrap_or(&session.principal.miro_user_id);
            format!(
                "<p>Signed in as {}</p><a href=\"/logout\">Sign out</a>",
                html_escape::encode_text(who)
            )
        }
        None => "<p>Not signed in</p><a href=\"/login\">Sign in</a>".to_string(),
    };

    Html(format!(
        "<!DOCTYPE html><html><head><title>miroteams</title></head><body><h1>miroteams</h1>{body}</body></html>"
    ))
}

/// GET /some_protected_route
///
/// Placeholder behind the session guard.
async fn some_protected_route(CurrentSession(session): CurrentSession) -> Result<(), AppError> {
    tracing::debug!(user_id = %session.principal.user_id, "Protected route reached");
    Err(AppError::NotImplemented(
        "some_protected_route is not implemented yet".to_string(),
    ))
}
