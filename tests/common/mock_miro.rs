//! In-process stand-in for the Miro OAuth endpoints

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
/// The only authorization code the mock accepts
pub const VALID_CODE: &str = "valid-code";
pub const ACCESS_TOKEN: &str = "mock-access-token";
pub const MIRO_USER_ID: &str = "3074457350000001";
pub const MIRO_USER_NAME: &str = "Ada Lovelace";
pub const MIRO_TEAM_NAME: &str = "Analytical Engines";

#[derive(Default)]
struct Counters {
    token_requests: AtomicUsize,
}

/// Running mock provider
pub struct MockMiro {
    pub addr: String,
    counters: Arc<Counters>,
}

impl MockMiro {
    pub async fn start() -> Self {
        let counters = Arc::new(Counters::default());

        let app = Router::new()
            .route("/v1/oauth/token", post(token))
            .route("/v1/oauth-token", get(token_context))
            .with_state(counters.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, counters }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Number of code exchanges attempted against the mock
    pub fn token_requests(&self) -> usize {
        self.counters.token_requests.load(Ordering::SeqCst)
    }
}

async fn token(
    State(counters): State<Arc<Counters>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    counters.token_requests.fetch_add(1, Ordering::SeqCst);

    let valid = params.get("grant_type").map(String::as_str) == Some("authorization_code")
        && params.get("client_id").map(String::as_str) == Some(CLIENT_ID)
        && params.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET)
        && params.get("code").map(String::as_str) == Some(VALID_CODE)
        && params.contains_key("redirect_uri");

    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": 400,
                "code": "invalidParameters",
                "message": "Invalid authorization code",
                "type": "error"
            })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "scope": "boards:read identity:read team:read",
        "user_id": MIRO_USER_ID,
        "team_id": "3074457360000001",
        "expires_in": 3599,
        "refresh_token": "mock-refresh-token"
    }))
    .into_response()
}

async fn token_context(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"));

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!({
        "type": "oauth_token",
        "team": { "id": "3074457360000001", "name": MIRO_TEAM_NAME },
        "createdBy": { "id": MIRO_USER_ID, "name": MIRO_USER_NAME },
        "user": { "id": MIRO_USER_ID, "name": MIRO_USER_NAME },
        "scopes": ["boards:read", "identity:read", "team:read"]
    }))
    .into_response()
}
