//! Common test utilities for E2E tests

#![allow(dead_code)]

pub mod mock_miro;
pub mod schema_validator;

use std::sync::Arc;

use miroteams::auth::{MemorySessionStore, Session, SessionStore, sign_session_id};
use miroteams::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub sessions: Arc<MemorySessionStore>,
    pub miro: mock_miro::MockMiro,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a mock Miro provider
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestServer::new`], letting the caller adjust the
    /// configuration before the app is built
    pub async fn with_config(customize: impl FnOnce(&mut config::AppConfig)) -> Self {
        let miro = mock_miro::MockMiro::start().await;

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Create test configuration
        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                domain: addr.to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                miro: config::MiroOAuthConfig {
                    client_id: mock_miro::CLIENT_ID.to_string(),
                    client_secret: mock_miro::CLIENT_SECRET.to_string(),
                    authorize_url: miro.url("/oauth/authorize"),
                    token_url: miro.url("/v1/oauth/token"),
                    token_context_url: miro.url("/v1/oauth-token"),
                    redirect_path: "/auth/miro/callback".to_string(),
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        customize(&mut config);

        // Initialize app state with an inspectable session store
        let db = miroteams::data::Database::connect(&db_path).await.unwrap();
        let sessions = Arc::new(MemorySessionStore::new());
        let state = AppState::from_parts(config, Arc::new(db), sessions.clone()).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Build router
        let app = miroteams::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            sessions,
            miro,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Log a team in directly through the service layer and open a session
    /// for its user
    ///
    /// # Returns
    /// A `Cookie` header value carrying the signed session
    pub async fn create_session_cookie(&self, team_name: &str) -> String {
        use miroteams::auth::Principal;

        let login = self.state.teams.login_team(team_name).await.unwrap();
        let session = Session::new(
            Principal {
                user_id: login.user.id,
                team_id: login.team.id,
                miro_user_id: "3074457350000099".to_string(),
                name: Some("Test User".to_string()),
            },
            self.state.config.auth.session_max_age,
        );
        let session_id = session.id.clone();
        self.sessions.insert(session).await.unwrap();

        let value = sign_session_id(&session_id, &self.state.config.auth.session_secret)
            .expect("Failed to sign session");
        format!("session={value}")
    }
}

/// Client that does not follow redirects
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Value of the `location` header
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Value of cookie `name` among the response's `set-cookie` headers
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
}
