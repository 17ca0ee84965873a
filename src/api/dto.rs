//! API request and response DTOs
//!
//! Wire names are camelCase, matching the Miro web plugin that calls
//! these endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::data::UserProfile;
use crate::error::AppError;

/// Unwrap a JSON body, turning extractor rejections into 400s
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Plain `{message}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// GET /api/verifyUser query
#[derive(Debug, Deserialize)]
pub struct VerifyUserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// GET /api/verifyUser response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyUserResponse {
    pub message: String,
    pub verified: bool,
}

/// POST /api/teams/login body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLoginRequest {
    #[serde(default)]
    pub team_name: Option<String>,
}

/// POST /api/teams/login response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLoginResponse {
    pub user_id: String,
    pub team_id: String,
    pub message: String,
}

/// POST /api/miro/userInfo body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiroUserInfoRequest {
    #[serde(default)]
    pub user_info: Option<UserProfile>,
    #[serde(default)]
    pub online_users: Option<Vec<UserProfile>>,
}
