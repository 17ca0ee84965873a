//! Team service
//!
//! Team login, principal resolution after OAuth, questionnaire submission
//! and bulk user ingestion.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::auth::{MiroTokenContext, Principal};
use crate::data::{Database, Questionnaire, Team, User, UserProfile};
use crate::error::AppError;
use crate::metrics::{QUESTIONNAIRES_SUBMITTED_TOTAL, TEAMS_CREATED_TOTAL, USERS_CREATED_TOTAL};

/// Result of a team login: the team and its canonical user
#[derive(Debug, Clone)]
pub struct TeamLogin {
    pub team: Team,
    pub user: User,
}

/// Team service
#[derive(Clone)]
pub struct TeamService {
    db: Arc<Database>,
}

impl TeamService {
    /// Create new team service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn resolve_team(&self, name: &str) -> Result<Team, AppError> {
        let (team, created) = self.db.create_team_if_absent(name).await?;
        if created {
            TEAMS_CREATED_TOTAL.inc();
            tracing::info!(team_id = %team.id, team_name = %team.name, "Team created");
        }
        Ok(team)
    }

    async fn create_user(&self, user: User) -> Result<User, AppError> {
        self.db.save_user(&user).await?;
        USERS_CREATED_TOTAL.inc();
        tracing::info!(user_id = %user.id, team_id = ?user.team_id, "User created");
        Ok(user)
    }

    /// Log a team in by name
    ///
    /// Creates the team on first use, then returns its first user,
    /// creating an empty one if the team has none yet. Repeated calls with
    /// the same name return the same team and user.
    ///
    /// # Errors
    /// `Validation` if the name is blank
    pub async fn login_team(&self, team_name: &str) -> Result<TeamLogin, AppError> {
        if team_name.trim().is_empty() {
            return Err(AppError::Validation(
                "teamName is missing in the request".to_string(),
            ));
        }

        let team = self.resolve_team(team_name).await?;

        let user = match self.db.find_first_user_in_team(&team.id).await? {
            Some(user) => user,
            None => self.create_user(User::for_team(&team)).await?,
        };

        Ok(TeamLogin { team, user })
    }

    /// Map a Miro token context to a local principal
    ///
    /// The Miro team is matched to a local team by name and the Miro user
    /// to a member of that team by Miro user ID; either is created when
    /// missing.
    pub async fn resolve_principal(
        &self,
        context: &MiroTokenContext,
    ) -> Result<Principal, AppError> {
        let team = self.resolve_team(context.team_name()).await?;

        let user = match self
            .db
            .find_team_user_by_miro_id(&team.id, &context.user.id)
            .await?
        {
            Some(user) => user,
            None => {
                let profile = UserProfile {
                    miro_id: Some(context.user.id.clone()),
                    name: context.user.name.clone(),
                    ..UserProfile::default()
                };
                self.create_user(User::new(profile, Some(team.id.clone())))
                    .await?
            }
        };

        Ok(Principal {
            user_id: user.id,
            team_id: team.id,
            miro_user_id: context.user.id.clone(),
            name: user.name.or_else(|| context.user.name.clone()),
        })
    }

    /// Check whether a user exists
    pub async fn user_exists(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.db.find_user(user_id).await?.is_some())
    }

    /// Store a questionnaire for `team_id`
    ///
    /// The team ID is taken as given; only the foreign key ties it to an
    /// existing team.
    pub async fn submit_questionnaire(
        &self,
        team_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Questionnaire, AppError> {
        let questionnaire = Questionnaire::new(team_id, fields);
        self.db.save_questionnaire(&questionnaire).await?;
        QUESTIONNAIRES_SUBMITTED_TOTAL.inc();

        tracing::info!(
            questionnaire_id = %questionnaire.id,
            team_id = %questionnaire.team_id,
            "Questionnaire submitted"
        );

        Ok(questionnaire)
    }

    /// Store the reporting user and every online user as new rows
    ///
    /// No deduplication: repeated calls insert the same people again.
    ///
    /// # Returns
    /// Number of users stored
    pub async fn ingest_users(
        &self,
        user_info: UserProfile,
        online_users: Vec<UserProfile>,
    ) -> Result<usize, AppError> {
        let users: Vec<User> = std::iter::once(user_info)
            .chain(online_users)
            .map(|profile| User::new(profile, None))
            .collect();

        self.db.save_users(&users).await?;
        USERS_CREATED_TOTAL.inc_by(users.len() as u64);

        tracing::info!(count = users.len(), "Miro user info saved");

        Ok(users.len())
    }
}
