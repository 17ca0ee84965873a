//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Team
// =============================================================================

/// A tenant-like grouping that users and questionnaires belong to.
///
/// `name` is unique across all teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Build an unsaved team
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new().0,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A Miro user known to this service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// User ID on the Miro side
    pub miro_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Remaining profile fields (JSON object)
    pub profile: String,
    /// Owning team; cleared if the team is deleted
    pub team_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user from client-supplied profile data
    pub fn new(profile: UserProfile, team_id: Option<String>) -> Self {
        Self {
            id: EntityId::new().0,
            miro_id: profile.miro_id,
            name: profile.name,
            email: profile.email,
            profile: Value::Object(profile.extra).to_string(),
            team_id,
            created_at: Utc::now(),
        }
    }

    /// Build an unsaved user with no profile data, owned by `team`
    pub fn for_team(team: &Team) -> Self {
        Self::new(UserProfile::default(), Some(team.id.clone()))
    }

    /// Decoded extra profile fields
    pub fn profile_fields(&self) -> Map<String, Value> {
        parse_json_object(&self.profile)
    }
}

/// Profile data as posted by the Miro SDK
///
/// `id` is the Miro user ID. Fields not modelled explicitly are kept in
/// `extra` and persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "id", default, deserialize_with = "string_or_number")]
    pub miro_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept IDs sent either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number for id, got {other}"
        ))),
    }
}

// =============================================================================
// Questionnaire
// =============================================================================

/// A submitted questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Questionnaire {
    pub id: String,
    /// Client-supplied; not checked against the caller's session
    pub team_id: String,
    /// Submitted form fields (JSON object)
    pub fields: String,
    pub created_at: DateTime<Utc>,
}

impl Questionnaire {
    /// Build an unsaved questionnaire
    pub fn new(team_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: EntityId::new().0,
            team_id: team_id.into(),
            fields: Value::Object(fields).to_string(),
            created_at: Utc::now(),
        }
    }

    /// Decoded form fields
    pub fn form_fields(&self) -> Map<String, Value> {
        parse_json_object(&self.fields)
    }
}

fn parse_json_object(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
