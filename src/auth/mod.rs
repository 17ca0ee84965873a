//! Miro OAuth authentication
//!
//! Handles:
//! - Miro OAuth flow
//! - Session management
//! - Session guard middleware

mod middleware;
mod oauth;
mod provider;
pub mod session;

pub use middleware::{
    Access, CurrentSession, LOGIN_PATH, MaybeSession, ensure_authenticated, load_session,
    require_session,
};
pub use oauth::{OAUTH_STATE_COOKIE, auth_router};
pub use provider::{MiroClient, MiroRef, MiroToken, MiroTokenContext};
pub use session::{
    MemorySessionStore, Principal, SESSION_COOKIE, Session, SessionStore, sign_session_id,
    verify_session_cookie,
};
