/// Integration tests for entity CRUD against PostgreSQL
///
/// These tests require a running PostgreSQL database and are ignored by
/// default. Run with: cargo test --test db_models_tests -- --ignored

mod common;

use castwright_shared::error::SchemaError;
use castwright_shared::models::audio_file::{AudioFile, AudioStatus, CreateAudioFile, UpdateAudioFile};
use castwright_shared::models::project::{CreateProject, Project, ProjectStatus, UpdateProject};
use castwright_shared::models::script::{CreateScript, Script};
use castwright_shared::models::subscription::{CreateSubscription, Subscription};
use castwright_shared::models::task::{CreateTask, Task, UpdateTask};
use castwright_shared::models::topic_suggestion::{CreateTopicSuggestion, TopicSuggestion};
use castwright_shared::models::usage_log::{CreateUsageLog, UsageLog};
use castwright_shared::models::user::{CreateUser, UpdateUser, User, UserTier};
use castwright_shared::validation::from_json;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_task_lifecycle() {
    let pool = common::setup().await;

    let task = Task::create(&pool, CreateTask { title: "Write show notes".to_string() })
        .await
        .unwrap();
    assert!(!task.completed);

    // Empty patch leaves the row untouched
    let same = Task::update(&pool, task.id, UpdateTask::default()).await.unwrap().unwrap();
    assert_eq!(same, task);

    let done = Task::update(&pool, task.id, UpdateTask { completed: Some(true), ..Default::default() })
        .await
        .unwrap()
        .unwrap();
    assert!(done.completed);
    assert_eq!(done.title, "Write show notes");

    assert!(Task::delete(&pool, task.id).await.unwrap());
    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
    assert!(Task::update(&pool, task.id, UpdateTask::default()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_task_rejects_empty_title_before_insert() {
    let pool = common::setup().await;

    let err = Task::create(&pool, CreateTask { title: String::new() }).await.unwrap_err();
    assert!(matches!(err, SchemaError::Validation(_)));

    // The column check rejects what validation would have caught
    let direct = sqlx::query("INSERT INTO tasks (title) VALUES ('')")
        .execute(&pool)
        .await
        .map_err(SchemaError::from)
        .unwrap_err();
    assert_eq!(direct.violations().unwrap()[0].rule, "check");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_email_and_username_conflict() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    assert_eq!(user.tier, UserTier::Free);
    assert!(user.is_active);

    let same_email = CreateUser::new(user.email.clone(), format!("other_{}", common::unique()), "hash");
    match User::create(&pool, same_email).await {
        Err(SchemaError::Conflict { field }) => assert_eq!(field, "email"),
        other => panic!("expected email conflict, got {:?}", other),
    }

    let same_username = CreateUser::new(format!("{}@example.org", common::unique()), user.username.clone(), "hash");
    match User::create(&pool, same_username).await {
        Err(SchemaError::Conflict { field }) => assert_eq!(field, "username"),
        other => panic!("expected username conflict, got {:?}", other),
    }

    assert_eq!(
        User::find_by_username(&pool, &user.username).await.unwrap().map(|u| u.id),
        Some(user.id)
    );
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_email_uniqueness_ignores_case() {
    let pool = common::setup().await;
    let tag = common::unique();

    let user = User::create(
        &pool,
        CreateUser::new(format!("Host-{tag}@Example.com"), format!("host_{tag}"), "hash"),
    )
    .await
    .unwrap();

    let shouted = CreateUser::new(format!("host-{tag}@example.COM"), format!("other_{tag}"), "hash");
    match User::create(&pool, shouted).await {
        Err(SchemaError::Conflict { field }) => assert_eq!(field, "email"),
        other => panic!("expected email conflict, got {:?}", other),
    }

    let found = User::find_by_email(&pool, &format!("HOST-{tag}@EXAMPLE.COM")).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert_eq!(user.email, format!("Host-{tag}@Example.com"));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_decimals_that_would_round_never_reach_the_database() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let data = CreateSubscription {
        price_monthly: Decimal::from_str("19.999").unwrap(),
        ..from_json(json!({
            "user_id": user.id,
            "tier": "premium",
            "price_monthly": "19.99",
            "monthly_project_limit": 50,
            "monthly_audio_minutes_limit": "600.00"
        }))
        .unwrap()
    };
    let err = Subscription::create(&pool, data).await.unwrap_err();
    assert_eq!(err.violations().unwrap()[0].rule, "scale");
    assert!(Subscription::list_by_user(&pool, user.id).await.unwrap().is_empty());

    let project = CreateProject {
        target_duration_minutes: Some(Decimal::from(10000)),
        ..CreateProject::new(user.id, "Marathon")
    };
    match Project::create(&pool, project).await {
        Err(SchemaError::Validation(violations)) => {
            assert_eq!(violations[0].field, "target_duration_minutes");
            assert_eq!(violations[0].rule, "range");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_user_minutes_keep_exact_precision() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let update = UpdateUser {
        monthly_audio_minutes: Some(Decimal::from_str("19.99").unwrap()),
        ..Default::default()
    };
    let updated = User::update(&pool, user.id, update).await.unwrap().unwrap();
    assert_eq!(updated.monthly_audio_minutes.to_string(), "19.99");
    assert_eq!(updated.email, user.email);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_project_status_patch_keeps_other_fields() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let data: CreateProject = from_json(json!({
        "user_id": user.id,
        "title": "AI in 10 minutes",
        "category": "technology",
        "tags": ["tech", "ai"]
    }))
    .unwrap();
    let project = Project::create(&pool, data).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Draft);
    assert!(project.topic_suggestion_id.is_none());

    let patch: UpdateProject = from_json(json!({ "status": "script_ready" })).unwrap();
    let updated = Project::update(&pool, project.id, patch).await.unwrap().unwrap();

    assert_eq!(updated.status, ProjectStatus::ScriptReady);
    assert_eq!(updated.title, project.title);
    assert_eq!(updated.tags, vec!["tech", "ai"]);
    assert_eq!(updated.category.as_deref(), Some("technology"));

    let skip = UpdateProject { status: Some(ProjectStatus::Published), ..Default::default() };
    let err = Project::update(&pool, project.id, skip).await.unwrap_err();
    assert!(matches!(err, SchemaError::InvalidTransition { .. }));

    assert_eq!(Project::count_by_user(&pool, user.id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_project_requires_existing_user() {
    let pool = common::setup().await;

    let err = Project::create(&pool, CreateProject::new(Uuid::new_v4(), "Orphan")).await.unwrap_err();
    match err {
        SchemaError::MissingReference { field } => assert_eq!(field, "user_id"),
        other => panic!("expected missing reference, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_topic_deletion_detaches_projects() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let category = format!("cat-{}", common::unique());

    let topic = TopicSuggestion::create(
        &pool,
        from_json::<CreateTopicSuggestion>(json!({
            "title": "Deep sea creatures",
            "category": category,
            "popularity_score": "87.50"
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    let mut data = CreateProject::new(user.id, "Into the abyss");
    data.topic_suggestion_id = Some(topic.id);
    let project = Project::create(&pool, data).await.unwrap();

    let listed = TopicSuggestion::list_by_category(&pool, &category, 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].popularity_score.to_string(), "87.50");

    assert!(TopicSuggestion::delete(&pool, topic.id).await.unwrap());
    let project = Project::find_by_id(&pool, project.id).await.unwrap().unwrap();
    assert!(project.topic_suggestion_id.is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_one_current_script_per_project() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let project = common::create_project(&pool, &user).await;

    let v1 = Script::create(&pool, CreateScript::new(project.id, "Hello there")).await.unwrap();
    let v2 = Script::create(&pool, CreateScript::new(project.id, "Hello again, listeners")).await.unwrap();

    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(v2.word_count, 3);

    let current = Script::find_current(&pool, project.id).await.unwrap().unwrap();
    assert_eq!(current.id, v2.id);

    Script::set_current(&pool, v1.id).await.unwrap().unwrap();
    let scripts = Script::list_by_project(&pool, project.id).await.unwrap();
    let current: Vec<_> = scripts.iter().filter(|s| s.is_current).map(|s| s.id).collect();
    assert_eq!(current, vec![v1.id]);

    let mut duplicate = CreateScript::new(project.id, "Same number");
    duplicate.version = Some(2);
    match Script::create(&pool, duplicate).await {
        Err(SchemaError::Conflict { field }) => assert_eq!(field, "version"),
        other => panic!("expected version conflict, got {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_current_switches_serialise() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let project = common::create_project(&pool, &user).await;

    let v1 = Script::create(&pool, CreateScript::new(project.id, "First take")).await.unwrap();
    let v2 = Script::create(&pool, CreateScript::new(project.id, "Second take")).await.unwrap();

    for _ in 0..10 {
        let (a, b) = tokio::join!(
            Script::set_current(&pool, v1.id),
            Script::set_current(&pool, v2.id)
        );
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());

        let scripts = Script::list_by_project(&pool, project.id).await.unwrap();
        assert_eq!(scripts.iter().filter(|s| s.is_current).count(), 1);
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_audio_self_reference_and_cycles() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let project = common::create_project(&pool, &user).await;

    let original = AudioFile::create(&pool, CreateAudioFile::new(project.id, "raw.mp3", "audio/raw.mp3"))
        .await
        .unwrap();
    let mut enhanced = CreateAudioFile::new(project.id, "clean.mp3", "audio/clean.mp3");
    enhanced.original_file_id = Some(original.id);
    enhanced.is_enhanced = true;
    let enhanced = AudioFile::create(&pool, enhanced).await.unwrap();

    let versions = AudioFile::list_enhanced_versions(&pool, original.id).await.unwrap();
    assert_eq!(versions.iter().map(|a| a.id).collect::<Vec<_>>(), vec![enhanced.id]);

    let own = UpdateAudioFile { original_file_id: Some(Some(original.id)), ..Default::default() };
    let err = AudioFile::update(&pool, original.id, own).await.unwrap_err();
    assert_eq!(err.violations().unwrap()[0].rule, "self_reference");

    let loop_back = UpdateAudioFile { original_file_id: Some(Some(enhanced.id)), ..Default::default() };
    let err = AudioFile::update(&pool, original.id, loop_back).await.unwrap_err();
    assert_eq!(err.violations().unwrap()[0].rule, "cycle");

    // The DDL check backs up the in-process rule
    let direct = sqlx::query("UPDATE audio_files SET original_file_id = id WHERE id = $1")
        .bind(original.id)
        .execute(&pool)
        .await
        .map_err(SchemaError::from)
        .unwrap_err();
    assert_eq!(direct.violations().unwrap()[0].field, "original_file_id");

    let processing = UpdateAudioFile { status: Some(AudioStatus::Processing), ..Default::default() };
    let updated = AudioFile::update(&pool, enhanced.id, processing).await.unwrap().unwrap();
    assert_eq!(updated.status, AudioStatus::Processing);
    assert_eq!(updated.speed.to_string(), "1.00");

    // Deleting the original keeps the enhanced copy
    assert!(AudioFile::delete(&pool, original.id).await.unwrap());
    let orphan = AudioFile::find_by_id(&pool, enhanced.id).await.unwrap().unwrap();
    assert!(orphan.original_file_id.is_none());
}

async fn link(pool: &sqlx::PgPool, id: Uuid, original: Uuid) -> Result<(), SchemaError> {
    let patch = UpdateAudioFile { original_file_id: Some(Some(original)), ..Default::default() };
    AudioFile::update(pool, id, patch).await.map(|_| ())
}

/// Follows original links from `start`; None if the walk never ends
async fn lineage_length(pool: &sqlx::PgPool, start: Uuid) -> Option<usize> {
    let mut next = Some(start);
    for steps in 0..16 {
        match next {
            None => return Some(steps),
            Some(id) => next = AudioFile::find_by_id(pool, id).await.unwrap().unwrap().original_file_id,
        }
    }
    None
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_relinks_never_form_a_loop() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;
    let project = common::create_project(&pool, &user).await;

    for _ in 0..5 {
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d", "e", "f"] {
            let file_name = format!("{name}.mp3");
            let file = AudioFile::create(&pool, CreateAudioFile::new(project.id, file_name.clone(), file_name))
                .await
                .unwrap();
            ids.push(file.id);
        }
        let (a, b, c, d, e, f) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);

        // Two files pointing at each other
        let (first, second) = tokio::join!(link(&pool, a, b), link(&pool, b, a));
        assert!(first.is_ok() != second.is_ok(), "{:?} / {:?}", first, second);
        for rejected in [first, second].into_iter().filter_map(Result::err) {
            let is_cycle = matches!(&rejected, SchemaError::Validation(v) if v[0].rule == "cycle");
            let is_conflict =
                matches!(&rejected, SchemaError::Conflict { field } if field == "original_file_id");
            assert!(is_cycle || is_conflict, "{:?}", rejected);
        }

        // A four-file loop c -> d -> e -> f -> c closed by links on disjoint rows
        link(&pool, d, e).await.unwrap();
        link(&pool, f, c).await.unwrap();
        let (first, second) = tokio::join!(link(&pool, c, d), link(&pool, e, f));
        assert!(!(first.is_ok() && second.is_ok()), "{:?} / {:?}", first, second);

        for id in ids {
            assert!(lineage_length(&pool, id).await.is_some());
        }
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_subscription_price_round_trip() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    let data: CreateSubscription = from_json(json!({
        "user_id": user.id,
        "tier": "premium",
        "price_monthly": "19.99",
        "monthly_project_limit": 50,
        "monthly_audio_minutes_limit": "600.00"
    }))
    .unwrap();
    let subscription = Subscription::create(&pool, data).await.unwrap();

    let stored = Subscription::find_by_id(&pool, subscription.id).await.unwrap().unwrap();
    assert_eq!(stored.price_monthly.to_string(), "19.99");
    assert_eq!(stored.currency, "USD");
    assert_eq!(Subscription::list_by_user(&pool, user.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_usage_logs_cascade_with_user() {
    let pool = common::setup().await;
    let user = common::create_user(&pool).await;

    for _ in 0..2 {
        UsageLog::create(
            &pool,
            CreateUsageLog {
                user_id: user.id,
                action: "project_created".to_string(),
                resource_type: "project".to_string(),
                resource_id: None,
                log_metadata: Default::default(),
            },
        )
        .await
        .unwrap();
    }

    assert_eq!(
        UsageLog::count_by_user_and_action(&pool, user.id, "project_created").await.unwrap(),
        2
    );
    assert_eq!(UsageLog::list_by_user(&pool, user.id, 10, 0).await.unwrap().len(), 2);

    assert!(User::delete(&pool, user.id).await.unwrap());
    assert_eq!(UsageLog::list_by_user(&pool, user.id, 10, 0).await.unwrap().len(), 0);
}
