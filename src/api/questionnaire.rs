//! Questionnaire endpoints

use axum::{Json, Router, extract::State, extract::rejection::JsonRejection, routing::post};
use serde_json::{Map, Value};

use super::dto::{MessageResponse, json_body};
use crate::AppState;
use crate::error::AppError;

/// Create questionnaire router
///
/// Routes:
/// - POST /questionnaire/submit - Store a questionnaire for a team
pub fn questionnaire_router() -> Router<AppState> {
    Router::new().route("/questionnaire/submit", post(submit_questionnaire))
}

/// POST /api/questionnaire/submit
///
/// Body is `{teamId, ...fields}`. Everything except `teamId` is stored as
/// the questionnaire's form fields. `teamId` is not checked against the
/// caller's session.
async fn submit_questionnaire(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut fields = json_body(body)?;

    let team_id = match fields.remove("teamId") {
        Some(Value::String(id)) if !id.is_empty() => id,
        None | Some(Value::Null) | Some(Value::String(_)) => {
            return Err(AppError::Validation(
                "teamId is missing in the request".to_string(),
            ));
        }
        Some(_) => {
            return Err(AppError::Validation("teamId must be a string".to_string()));
        }
    };

    state.teams.submit_questionnaire(&team_id, fields).await?;

    Ok(Json(MessageResponse::new("Data submitted successfully")))
}
