//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "teams.example.com" or "localhost:8080")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the service
    ///
    /// # Returns
    /// Full URL like "https://teams.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration (Miro OAuth + sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    pub miro: MiroOAuthConfig,
}

/// Miro OAuth application settings
#[derive(Debug, Clone, Deserialize)]
pub struct MiroOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is redirected to
    #[serde(default = "default_miro_authorize_url")]
    pub authorize_url: String,
    /// Code-for-token exchange endpoint
    #[serde(default = "default_miro_token_url")]
    pub token_url: String,
    /// Endpoint describing the user and team behind an access token
    #[serde(default = "default_miro_token_context_url")]
    pub token_context_url: String,
    /// Callback path on this service, appended to `server.base_url()`
    #[serde(default = "default_miro_redirect_path")]
    pub redirect_path: String,
}

impl AuthConfig {
    /// Full callback URL registered with Miro
    pub fn redirect_uri(&self, server: &ServerConfig) -> String {
        format!("{}{}", server.base_url(), self.miro.redirect_path)
    }
}

fn default_miro_authorize_url() -> String {
    "https://miro.com/oauth/authorize".to_string()
}

fn default_miro_token_url() -> String {
    "https://api.miro.com/v1/oauth/token".to_string()
}

fn default_miro_token_context_url() -> String {
    "https://api.miro.com/v1/oauth-token".to_string()
}

fn default_miro_redirect_path() -> String {
    "/auth/miro/callback".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MIROTEAMS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/miroteams.db")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.miro.authorize_url", default_miro_authorize_url())?
            .set_default("auth.miro.token_url", default_miro_token_url())?
            .set_default(
                "auth.miro.token_context_url",
                default_miro_token_context_url(),
            )?
            .set_default("auth.miro.redirect_path", default_miro_redirect_path())?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MIROTEAMS__*)
            .add_source(
                Environment::with_prefix("MIROTEAMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.miro.client_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.miro.client_id must not be empty".to_string(),
            ));
        }

        for (key, value) in [
            ("auth.miro.authorize_url", &self.auth.miro.authorize_url),
            ("auth.miro.token_url", &self.auth.miro.token_url),
            (
                "auth.miro.token_context_url",
                &self.auth.miro.token_context_url,
            ),
        ] {
            url::Url::parse(value).map_err(|e| {
                crate::error::AppError::Config(format!("{key} is not a valid URL: {e}"))
            })?;
        }

        let redirect_path = self.auth.miro.redirect_path.as_str();
        if !redirect_path.starts_with('/') {
            return Err(crate::error::AppError::Config(
                "auth.miro.redirect_path must start with '/'".to_string(),
            ));
        }

        // The callback is mounted next to the fixed routes
        if RESERVED_PATHS.contains(&redirect_path)
            || redirect_path == "/api"
            || redirect_path.starts_with("/api/")
        {
            return Err(crate::error::AppError::Config(format!(
                "auth.miro.redirect_path must not reuse the route {redirect_path}"
            )));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

/// Routes served at fixed paths
const RESERVED_PATHS: &[&str] = &[
    "/",
    "/health",
    "/metrics",
    "/login",
    "/logout",
    "/auth/miro",
    "/some_protected_route",
];

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
