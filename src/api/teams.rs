//! Team and user endpoints

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
    routing::{get, post},
};

use super::dto::{
    MessageResponse, MiroUserInfoRequest, TeamLoginRequest, TeamLoginResponse, VerifyUserQuery,
    VerifyUserResponse, json_body,
};
use crate::AppState;
use crate::error::AppError;

/// Create team router
///
/// Routes:
/// - GET /verifyUser - Check a user ID
/// - POST /teams/login - Find or create a team and its user
/// - POST /miro/userInfo - Store users reported by the Miro plugin
pub fn teams_router() -> Router<AppState> {
    Router::new()
        .route("/verifyUser", get(verify_user))
        .route("/teams/login", post(team_login))
        .route("/miro/userInfo", post(miro_user_info))
}

/// GET /api/verifyUser?userId=...
///
/// 200 when the user exists, 404 when it does not. 400 "Invalid userId"
/// when `userId` is absent or repeated, 400 "userId is missing" when empty.
async fn verify_user(
    State(state): State<AppState>,
    query: Result<Query<VerifyUserQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<VerifyUserResponse>), AppError> {
    let invalid = || AppError::Validation("Invalid userId".to_string());

    let Query(query) = query.map_err(|_| invalid())?;
    let user_id = query.user_id.ok_or_else(invalid)?;
    if user_id.is_empty() {
        return Err(AppError::Validation(
            "userId is missing in the request".to_string(),
        ));
    }

    if state.teams.user_exists(&user_id).await? {
        Ok((
            StatusCode::OK,
            Json(VerifyUserResponse {
                message: "MiroUser exists".to_string(),
                verified: true,
            }),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(VerifyUserResponse {
                message: "MiroUser not found".to_string(),
                verified: false,
            }),
        ))
    }
}

/// POST /api/teams/login
///
/// Resolves the team by name and returns its canonical user.
async fn team_login(
    State(state): State<AppState>,
    body: Result<Json<TeamLoginRequest>, JsonRejection>,
) -> Result<Json<TeamLoginResponse>, AppError> {
    let request = json_body(body)?;
    let team_name = request
        .team_name
        .ok_or_else(|| AppError::Validation("teamName is missing in the request".to_string()))?;

    let login = state.teams.login_team(&team_name).await?;

    Ok(Json(TeamLoginResponse {
        user_id: login.user.id,
        team_id: login.team.id,
        message: "Logged in successfully!".to_string(),
    }))
}

/// POST /api/miro/userInfo
///
/// Stores `userInfo` and every entry of `onlineUsers` as new users.
/// Repeated calls store duplicates.
async fn miro_user_info(
    State(state): State<AppState>,
    body: Result<Json<MiroUserInfoRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let request = json_body(body)?;
    let user_info = request
        .user_info
        .ok_or_else(|| AppError::Validation("userInfo is missing in the request".to_string()))?;

    state
        .teams
        .ingest_users(user_info, request.online_users.unwrap_or_default())
        .await?;

    Ok(Json(MessageResponse::new("Miro user info saved successfully")))
}
