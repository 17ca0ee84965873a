//! Database tests

use super::*;
use serde_json::{Map, json};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_team_save_and_find() {
    let (db, _temp_dir) = create_test_db().await;

    let team = Team::new("design-crew");
    db.save_team(&team).await.unwrap();

    let by_name = db.find_team_by_name("design-crew").await.unwrap().unwrap();
    assert_eq!(by_name.id, team.id);

    let by_id = db.find_team(&team.id).await.unwrap().unwrap();
    assert_eq!(by_id.name, "design-crew");

    assert!(db.find_team_by_name("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_team_name_is_unique() {
    let (db, _temp_dir) = create_test_db().await;

    db.save_team(&Team::new("dup")).await.unwrap();
    let result = db.save_team(&Team::new("dup")).await;

    assert!(matches!(result, Err(crate::error::AppError::Database(_))));
}

#[tokio::test]
async fn test_create_team_if_absent_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    let (first, created) = db.create_team_if_absent("alpha").await.unwrap();
    assert!(created);

    let (second, created) = db.create_team_if_absent("alpha").await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_create_team_if_absent_converges_under_concurrency() {
    let (db, _temp_dir) = create_test_db().await;
    let db = Arc::new(db);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.create_team_if_absent("racers").await.unwrap().0.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    ids.dedup();
    assert_eq!(ids.len(), 1, "all callers must see the same team");
}

#[tokio::test]
async fn test_first_user_in_team_is_oldest() {
    let (db, _temp_dir) = create_test_db().await;

    let team = Team::new("ordered");
    db.save_team(&team).await.unwrap();
    assert!(db.find_first_user_in_team(&team.id).await.unwrap().is_none());

    let first = User::for_team(&team);
    db.save_user(&first).await.unwrap();
    let second = User::for_team(&team);
    db.save_user(&second).await.unwrap();

    let found = db.find_first_user_in_team(&team.id).await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn test_find_team_user_by_miro_id() {
    let (db, _temp_dir) = create_test_db().await;

    let team = Team::new("miro");
    db.save_team(&team).await.unwrap();

    let profile = UserProfile {
        miro_id: Some("3074457345".to_string()),
        name: Some("Grace".to_string()),
        ..UserProfile::default()
    };
    let user = User::new(profile, Some(team.id.clone()));
    db.save_user(&user).await.unwrap();

    let found = db
        .find_team_user_by_miro_id(&team.id, "3074457345")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.name.as_deref(), Some("Grace"));

    assert!(
        db.find_team_user_by_miro_id(&team.id, "other")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_save_users_persists_every_row() {
    let (db, _temp_dir) = create_test_db().await;

    let profile = UserProfile {
        miro_id: Some("42".to_string()),
        ..UserProfile::default()
    };
    let users = vec![
        User::new(profile.clone(), None),
        User::new(profile.clone(), None),
        User::new(profile, None),
    ];
    db.save_users(&users).await.unwrap();

    assert_eq!(db.count_users_by_miro_id("42").await.unwrap(), 3);
    for user in &users {
        assert!(db.find_user(&user.id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_save_users_rolls_back_on_failure() {
    let (db, _temp_dir) = create_test_db().await;

    let profile = UserProfile {
        miro_id: Some("7".to_string()),
        ..UserProfile::default()
    };
    let user = User::new(profile, None);
    // Same primary key twice makes the second insert fail
    let result = db.save_users(&[user.clone(), user.clone()]).await;

    assert!(result.is_err());
    assert_eq!(db.count_users_by_miro_id("7").await.unwrap(), 0);
}

#[tokio::test]
async fn test_questionnaire_linked_to_team() {
    let (db, _temp_dir) = create_test_db().await;

    let team = Team::new("surveyed");
    db.save_team(&team).await.unwrap();

    let mut fields = Map::new();
    fields.insert("mood".to_string(), json!("great"));
    let questionnaire = Questionnaire::new(team.id.clone(), fields);
    db.save_questionnaire(&questionnaire).await.unwrap();

    let stored = db.get_questionnaires_by_team(&team.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].form_fields().get("mood"), Some(&json!("great")));
}

#[tokio::test]
async fn test_questionnaire_requires_existing_team() {
    let (db, _temp_dir) = create_test_db().await;

    let questionnaire = Questionnaire::new("missing-team", Map::new());
    let result = db.save_questionnaire(&questionnaire).await;

    assert!(result.is_err());
    assert_eq!(db.count_questionnaires().await.unwrap(), 0);
}
