//! Session management
//!
//! Sessions live server-side in a [`SessionStore`]. The browser only holds
//! the session ID, HMAC-signed so that forged IDs are rejected before any
//! store lookup.

use std::collections::HashMap;

use axum::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Name of the cookie carrying the signed session ID
pub const SESSION_COOKIE: &str = "session";

/// The authenticated identity behind a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Local user ID
    pub user_id: String,
    /// Local team ID
    pub team_id: String,
    /// User ID on the Miro side
    pub miro_user_id: String,
    /// Display name from Miro
    pub name: Option<String>,
}

/// Server-side session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Random session ID (URL-safe base64)
    pub id: String,
    pub principal: Principal,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a new session for `principal` lasting `max_age_secs`
    pub fn new(principal: Principal, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            principal,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn generate_session_id() -> String {
    use base64::{Engine as _, engine::general_purpose};
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// =============================================================================
// Cookie signing
// =============================================================================

/// Sign a session ID for use as a cookie value
///
/// Token format: id.base64(hmac_sha256(id))
///
/// # Arguments
/// * `session_id` - Session ID to sign
/// * `secret` - HMAC secret key
pub fn sign_session_id(session_id: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(session_id.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", session_id, signature_b64))
}

/// Verify a signed cookie value and return the session ID it carries
///
/// # Errors
/// Returns `Unauthorized` if the value is malformed or the signature
/// does not match.
pub fn verify_session_cookie(value: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (session_id, signature_b64) = value.split_once('.').ok_or(AppError::Unauthorized)?;
    if session_id.is_empty() || signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(session_id.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    Ok(session_id.to_string())
}

// =============================================================================
// Store
// =============================================================================

/// Server-side session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a freshly created session
    async fn insert(&self, session: Session) -> Result<(), AppError>;

    /// Look up a live session; expired sessions are reported as absent
    async fn get(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Destroy a session
    ///
    /// # Returns
    /// `true` if a session was removed
    async fn invalidate(&self, session_id: &str) -> Result<bool, AppError>;

    /// Drop every expired session
    ///
    /// # Returns
    /// Number of sessions removed
    async fn purge_expired(&self) -> Result<usize, AppError>;
}

/// Process-local session store
///
/// Sessions do not survive a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session = self.sessions.read().await.get(session_id).cloned();

        match session {
            Some(session) if session.is_expired() => {
                self.sessions.write().await.remove(session_id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn invalidate(&self, session_id: &str) -> Result<bool, AppError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, AppError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}
