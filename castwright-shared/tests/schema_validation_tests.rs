/// Validation and default-fill through the public API
///
/// No database needed.

use castwright_shared::error::{FieldViolation, SchemaError};
use castwright_shared::models::audio_file::{AudioStatus, CreateAudioFile};
use castwright_shared::models::project::{CreateProject, ProjectStatus};
use castwright_shared::models::script::CreateScript;
use castwright_shared::models::subscription::CreateSubscription;
use castwright_shared::models::task::{CreateTask, Task, UpdateTask};
use castwright_shared::models::user::{CreateUser, UserTier};
use castwright_shared::models::voice::VoiceType;
use castwright_shared::validation::{from_json, validated};
use serde_json::json;
use uuid::Uuid;

fn rules(err: &SchemaError) -> Vec<(String, String)> {
    err.violations()
        .expect("expected a validation error")
        .iter()
        .map(|v| (v.field.clone(), v.rule.clone()))
        .collect()
}

#[test]
fn test_task_title_boundaries() {
    assert!(validated(CreateTask { title: String::new() }).is_err());
    assert!(validated(CreateTask { title: "x".to_string() }).is_ok());
    assert!(validated(CreateTask { title: "é".repeat(200) }).is_ok());
    assert!(validated(CreateTask { title: "é".repeat(201) }).is_err());
}

#[test]
fn test_task_defaults_fill_on_construct() {
    let task: Task = serde_json::from_value(json!({ "id": 3, "title": "Pick a topic" })).unwrap();
    assert!(!task.completed);

    let mut patched = task.clone();
    UpdateTask::default().apply_to(&mut patched);
    assert_eq!(patched, task);
}

#[test]
fn test_user_email_shapes() {
    let ok = ["a@b.io", "first.last@sub.example.com", "x+tag@mail.co"];
    let bad = ["plain", "no-at.example.com", "a@b", "a@b.c", "a b@c.io"];

    for email in ok {
        assert!(validated(CreateUser::new(email, "host", "hash")).is_ok(), "{email}");
    }
    for email in bad {
        let err = validated(CreateUser::new(email, "host", "hash")).unwrap_err();
        assert_eq!(rules(&err), vec![("email".to_string(), "regex".to_string())], "{email}");
    }
}

#[test]
fn test_multiple_violations_are_all_reported() {
    let err = from_json::<CreateUser>(json!({
        "email": "nope",
        "username": "x",
        "password_hash": ""
    }))
    .unwrap_err();

    let fields: Vec<String> = rules(&err).into_iter().map(|(field, _)| field).collect();
    assert!(fields.contains(&"email".to_string()));
    assert!(fields.contains(&"username".to_string()));
    assert!(fields.contains(&"password_hash".to_string()));
}

#[test]
fn test_enum_members_checked_per_field() {
    let err = from_json::<CreateProject>(json!({
        "user_id": Uuid::new_v4(),
        "title": "Pilot",
        "status": "archived",
        "voice_type": "robot"
    }))
    .unwrap_err();

    assert_eq!(
        rules(&err),
        vec![
            ("status".to_string(), "enum".to_string()),
            ("voice_type".to_string(), "enum".to_string()),
        ]
    );
}

#[test]
fn test_declared_defaults() {
    let user: CreateUser = from_json(json!({
        "email": "host@example.com",
        "username": "host",
        "password_hash": "hash"
    }))
    .unwrap();
    assert_eq!(user.tier, UserTier::Free);

    let project: CreateProject =
        from_json(json!({ "user_id": Uuid::new_v4(), "title": "Pilot" })).unwrap();
    assert_eq!(project.status, ProjectStatus::Draft);
    assert_eq!(project.voice_type, VoiceType::MaleProfessional);
    assert!(project.tags.is_empty());

    let audio: CreateAudioFile = from_json(json!({
        "project_id": Uuid::new_v4(),
        "file_name": "a.mp3",
        "file_path": "a.mp3"
    }))
    .unwrap();
    assert_eq!(audio.status, AudioStatus::Pending);
    assert_eq!(audio.speed.to_string(), "1.00");

    let script: CreateScript =
        from_json(json!({ "project_id": Uuid::new_v4(), "content": "Hi" })).unwrap();
    assert!(script.is_current);
}

#[test]
fn test_decimal_fields_round_trip_exactly() {
    let body = json!({
        "user_id": Uuid::new_v4(),
        "tier": "professional",
        "price_monthly": "19.99",
        "monthly_project_limit": 0,
        "monthly_audio_minutes_limit": "0.10"
    });

    let subscription: CreateSubscription = from_json(body).unwrap();
    let text = serde_json::to_string(&subscription).unwrap();
    let back: CreateSubscription = serde_json::from_str(&text).unwrap();

    assert_eq!(back.price_monthly, subscription.price_monthly);
    assert_eq!(back.price_monthly.to_string(), "19.99");
    assert_eq!(back.monthly_audio_minutes_limit.to_string(), "0.10");
}

#[test]
fn test_violations_serialize_for_callers() {
    let violation = FieldViolation::new("title", "length", "Title must be 1-200 characters");
    assert_eq!(
        serde_json::to_value(&violation).unwrap(),
        json!({
            "field": "title",
            "rule": "length",
            "message": "Title must be 1-200 characters"
        })
    );
}
