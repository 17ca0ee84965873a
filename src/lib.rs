//! miroteams - Team login and Miro OAuth backend for a whiteboard integration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Team login / user verification / questionnaires          │
//! │  - Miro OAuth login, callback, logout                       │
//! │  - Session guard for protected routes                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Team resolution, principal mapping, ingestion            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Session store (in-memory)                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `auth`: Miro OAuth authentication and sessions
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like database pool, session store, and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Server-side sessions
    pub sessions: Arc<dyn auth::SessionStore>,

    /// Miro OAuth client
    pub miro: Arc<auth::MiroClient>,

    /// Team/user business logic
    pub teams: service::TeamService,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Create the in-memory session store
    /// 3. Build the Miro OAuth client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        let sessions = Arc::new(auth::MemorySessionStore::new());

        Self::from_parts(config, Arc::new(db), sessions)
    }

    /// Assemble state from already constructed storage and session store
    pub fn from_parts(
        config: config::AppConfig,
        db: Arc<data::Database>,
        sessions: Arc<dyn auth::SessionStore>,
    ) -> Result<Self, error::AppError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("miroteams/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let miro = auth::MiroClient::new(http_client, &config.auth, &config.server);
        let teams = service::TeamService::new(db.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            sessions,
            miro: Arc::new(miro),
            teams,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let metrics_routes = api::metrics_router::<AppState>().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_session,
    ));

    let api_routes = Router::new()
        .merge(api::teams_router())
        .merge(api::questionnaire_router());

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(&state.config.auth))
        .merge(api::pages_router(state.clone()))
        .nest("/api", api_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
