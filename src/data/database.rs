//! SQLite database operations
//!
//! All database access goes through this module.

use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Team
    // =========================================================================

    /// Find a team by ID
    pub async fn find_team(&self, id: &str) -> Result<Option<Team>, AppError> {
        let team = sqlx::query_as::<_, Team>("SELECT * FROM team WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(team)
    }

    /// Find a team by its unique name
    pub async fn find_team_by_name(&self, name: &str) -> Result<Option<Team>, AppError> {
        let team = sqlx::query_as::<_, Team>("SELECT * FROM team WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(team)
    }

    /// Persist a new team
    ///
    /// # Errors
    /// Fails with a unique violation if a team with the same name exists.
    pub async fn save_team(&self, team: &Team) -> Result<(), AppError> {
        sqlx::query("INSERT INTO team (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&team.id)
            .bind(&team.name)
            .bind(team.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Return the team named `name`, creating it if absent.
    ///
    /// Concurrent callers racing on the same new name converge on a single
    /// row: the loser of the insert hits the unique index and re-reads the
    /// winner's row.
    ///
    /// # Returns
    /// The team and whether this call created it
    pub async fn create_team_if_absent(&self, name: &str) -> Result<(Team, bool), AppError> {
        if let Some(team) = self.find_team_by_name(name).await? {
            return Ok((team, false));
        }

        let team = Team::new(name);
        match self.save_team(&team).await {
            Ok(()) => Ok((team, true)),
            Err(AppError::Database(error)) if is_unique_violation(&error) => {
                tracing::debug!(team_name = %name, "Team created concurrently; re-fetching");
                let existing = self.find_team_by_name(name).await?.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "team {name:?} vanished after unique violation"
                    ))
                })?;
                Ok((existing, false))
            }
            Err(error) => Err(error),
        }
    }

    // =========================================================================
    // User
    // =========================================================================

    /// Find a user by ID
    pub async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find the canonical (first-created) user of a team
    pub async fn find_first_user_in_team(&self, team_id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM user
            WHERE team_id = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a team member by Miro user ID
    pub async fn find_team_user_by_miro_id(
        &self,
        team_id: &str,
        miro_id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM user
            WHERE team_id = ? AND miro_id = ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(miro_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Count users carrying a Miro user ID
    pub async fn count_users_by_miro_id(&self, miro_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user WHERE miro_id = ?")
            .bind(miro_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Persist a new user
    pub async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.save_users(std::slice::from_ref(user)).await
    }

    /// Persist several new users in one transaction
    pub async fn save_users(&self, users: &[User]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for user in users {
            sqlx::query(
                r#"
                INSERT INTO user (id, miro_id, name, email, profile, team_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&user.id)
            .bind(&user.miro_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.profile)
            .bind(&user.team_id)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Questionnaire
    // =========================================================================

    /// Persist a new questionnaire
    ///
    /// # Errors
    /// Fails with a foreign key violation if `team_id` names no team.
    pub async fn save_questionnaire(&self, questionnaire: &Questionnaire) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO questionnaire (id, team_id, fields, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&questionnaire.id)
        .bind(&questionnaire.team_id)
        .bind(&questionnaire.fields)
        .bind(questionnaire.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List questionnaires submitted for a team, oldest first
    pub async fn get_questionnaires_by_team(
        &self,
        team_id: &str,
    ) -> Result<Vec<Questionnaire>, AppError> {
        let questionnaires = sqlx::query_as::<_, Questionnaire>(
            "SELECT * FROM questionnaire WHERE team_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questionnaires)
    }

    /// Count all stored questionnaires
    pub async fn count_questionnaires(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questionnaire")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
