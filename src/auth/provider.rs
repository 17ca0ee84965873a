//! Miro OAuth 2.0 client
//!
//! Talks to the Miro authorization server: builds the authorize URL,
//! exchanges authorization codes and reads the token context (who the
//! token belongs to and in which team).

use serde::Deserialize;

use crate::config::{AuthConfig, MiroOAuthConfig, ServerConfig};
use crate::error::AppError;

/// Token endpoint response
///
/// Only the access token is kept; the session replaces Miro's refresh
/// token and the token context names the user and team.
#[derive(Debug, Clone, Deserialize)]
pub struct MiroToken {
    pub access_token: String,
}

/// Identity reference inside a token context
#[derive(Debug, Clone, Deserialize)]
pub struct MiroRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Token context: the user and team an access token was issued for
#[derive(Debug, Clone, Deserialize)]
pub struct MiroTokenContext {
    pub user: MiroRef,
    pub team: MiroRef,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl MiroTokenContext {
    /// Team name used to key the local team; falls back to the Miro team ID
    pub fn team_name(&self) -> &str {
        self.team
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.team.id)
    }
}

/// Miro OAuth client
#[derive(Clone)]
pub struct MiroClient {
    http: reqwest::Client,
    config: MiroOAuthConfig,
    redirect_uri: String,
}

impl MiroClient {
    pub fn new(http: reqwest::Client, auth: &AuthConfig, server: &ServerConfig) -> Self {
        Self {
            http,
            config: auth.miro.clone(),
            redirect_uri: auth.redirect_uri(server),
        }
    }

    /// Callback URL sent to Miro
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build the browser redirect to the Miro consent screen
    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("invalid auth.miro.authorize_url: {e}")))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// `OAuth` if Miro rejects the code, `HttpClient` on transport failure
    pub async fn exchange_code(&self, code: &str) -> Result<MiroToken, AppError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .query(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::OAuth(format!(
                "token exchange failed with {status}: {body}"
            )));
        }

        let token: MiroToken = response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("malformed token response: {e}")))?;

        if token.access_token.is_empty() {
            return Err(AppError::OAuth("token response without access_token".to_string()));
        }

        Ok(token)
    }

    /// Fetch the user and team behind an access token
    pub async fn fetch_token_context(
        &self,
        access_token: &str,
    ) -> Result<MiroTokenContext, AppError> {
        let response = self
            .http
            .get(&self.config.token_context_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::OAuth(format!(
                "token context request failed with {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("malformed token context: {e}")))
    }
}
