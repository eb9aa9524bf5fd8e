/// Project model and database operations
///
/// A project is one piece of audio content owned by a user. It moves through
/// the production pipeline as scripts and audio are attached to it.
///
/// # State Machine
///
/// ```text
/// draft → script_ready → audio_generated → enhanced → published
///                        audio_generated → published
/// script_ready → draft
/// audio_generated → script_ready
/// enhanced → audio_generated
/// published → draft
/// ```
///
/// Going back one stage is allowed so a project can be reworked after its
/// script or audio is replaced.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     topic_suggestion_id UUID REFERENCES topic_suggestions(id) ON DELETE SET NULL,
///     title VARCHAR(200) NOT NULL,
///     description VARCHAR(2000),
///     category VARCHAR(100),
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     status TEXT NOT NULL DEFAULT 'draft',
///     voice_type TEXT NOT NULL DEFAULT 'male_professional',
///     custom_voice_settings JSONB NOT NULL DEFAULT '{}',
///     target_duration_minutes NUMERIC(6, 2),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::project::{Project, CreateProject, UpdateProject, ProjectStatus};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let mut data = CreateProject::new(user_id, "AI in 10 minutes");
/// data.tags = vec!["tech".to_string(), "ai".to_string()];
/// let project = Project::create(&pool, data).await?;
/// assert_eq!(project.status, ProjectStatus::Draft);
///
/// let ready = UpdateProject { status: Some(ProjectStatus::ScriptReady), ..Default::default() };
/// Project::update(&pool, project.id, ready).await?;
/// # Ok(())
/// # }
/// ```

use crate::error::SchemaResult;
use crate::field_map::FieldMap;
use crate::models::voice::VoiceType;
use crate::models::{check_transition, double_option, StatusMachine};
use crate::validation::{validate_tags, validate_target_minutes, validated, Payload};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Production stage of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Being planned, no usable script yet
    #[default]
    Draft,

    /// A current script is ready for narration
    ScriptReady,

    /// Narration audio exists
    AudioGenerated,

    /// Audio has been post-processed
    Enhanced,

    /// Released to the audience
    Published,
}

impl ProjectStatus {
    pub const VALUES: &'static [&'static str] =
        &["draft", "script_ready", "audio_generated", "enhanced", "published"];
}

impl StatusMachine for ProjectStatus {
    const ENTITY: &'static str = "project";

    fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::ScriptReady => "script_ready",
            ProjectStatus::AudioGenerated => "audio_generated",
            ProjectStatus::Enhanced => "enhanced",
            ProjectStatus::Published => "published",
        }
    }

    fn can_transition_to(&self, target: ProjectStatus) -> bool {
        use ProjectStatus::*;

        matches!(
            (self, target),
            (Draft, ScriptReady)
                | (ScriptReady, Draft)
                | (ScriptReady, AudioGenerated)
                | (AudioGenerated, ScriptReady)
                | (AudioGenerated, Enhanced)
                | (AudioGenerated, Published)
                | (Enhanced, AudioGenerated)
                | (Enhanced, Published)
                // Unpublish
                | (Published, Draft)
        )
    }
}

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    /// Topic the project was started from (cleared if the topic is deleted)
    pub topic_suggestion_id: Option<Uuid>,

    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: ProjectStatus,
    pub voice_type: VoiceType,

    /// Voice parameters used when `voice_type` is `custom`
    #[sqlx(json)]
    pub custom_voice_settings: FieldMap,

    /// Intended length of the finished audio
    pub target_duration_minutes: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProject {
    pub user_id: Uuid,

    #[serde(default)]
    pub topic_suggestion_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    #[serde(default)]
    pub category: Option<String>,

    #[validate(custom(function = "validate_tags"))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub voice_type: VoiceType,

    #[serde(default)]
    pub custom_voice_settings: FieldMap,

    #[validate(custom(function = "validate_target_minutes"))]
    #[serde(default)]
    pub target_duration_minutes: Option<Decimal>,
}

impl Payload for CreateProject {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[
        ("status", ProjectStatus::VALUES),
        ("voice_type", VoiceType::VALUES),
    ];
}

impl CreateProject {
    /// A draft project with default voice and no topic
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            user_id,
            topic_suggestion_id: None,
            title: title.into(),
            description: None,
            category: None,
            tags: Vec::new(),
            status: ProjectStatus::Draft,
            voice_type: VoiceType::default(),
            custom_voice_settings: FieldMap::new(),
            target_duration_minutes: None,
        }
    }
}

/// Input for updating a project
///
/// All fields are optional. Only non-None fields will be updated. The owner
/// of a project cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateProject {
    /// Use Some(None) to detach from the topic
    #[serde(default, deserialize_with = "double_option")]
    pub topic_suggestion_id: Option<Option<Uuid>>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,

    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,

    pub status: Option<ProjectStatus>,

    pub voice_type: Option<VoiceType>,

    pub custom_voice_settings: Option<FieldMap>,

    #[validate(custom(function = "validate_target_minutes"))]
    #[serde(default, deserialize_with = "double_option")]
    pub target_duration_minutes: Option<Option<Decimal>>,
}

impl Payload for UpdateProject {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[
        ("status", ProjectStatus::VALUES),
        ("voice_type", VoiceType::VALUES),
    ];
}

impl UpdateProject {
    pub fn is_empty(&self) -> bool {
        *self == UpdateProject::default()
    }

    /// Applies the patch to an in-memory project
    ///
    /// Status changes are checked against the state machine before anything
    /// is modified.
    pub fn apply_to(&self, project: &mut Project) -> SchemaResult<()> {
        if let Some(status) = self.status {
            check_transition(project.status, status)?;
            project.status = status;
        }
        if let Some(topic) = self.topic_suggestion_id {
            project.topic_suggestion_id = topic;
        }
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(category) = &self.category {
            project.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            project.tags = tags.clone();
        }
        if let Some(voice_type) = self.voice_type {
            project.voice_type = voice_type;
        }
        if let Some(settings) = &self.custom_voice_settings {
            project.custom_voice_settings = settings.clone();
        }
        if let Some(target) = self.target_duration_minutes {
            project.target_duration_minutes = target;
        }
        Ok(())
    }
}

impl Project {
    /// Creates a new project
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::MissingReference` if the owner or topic does not
    /// exist.
    pub async fn create(pool: &PgPool, data: CreateProject) -> SchemaResult<Self> {
        let data = validated(data)?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                user_id, topic_suggestion_id, title, description, category, tags,
                status, voice_type, custom_voice_settings, target_duration_minutes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, topic_suggestion_id, title, description, category, tags,
                      status, voice_type, custom_voice_settings, target_duration_minutes,
                      created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.topic_suggestion_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.tags)
        .bind(data.status)
        .bind(data.voice_type)
        .bind(Json(&data.custom_voice_settings))
        .bind(data.target_duration_minutes)
        .fetch_one(pool)
        .await?;

        tracing::debug!(project_id = %project.id, user_id = %project.user_id, "Created project");

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, user_id, topic_suggestion_id, title, description, category, tags,
                   status, voice_type, custom_voice_settings, target_duration_minutes,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists a user's projects, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> SchemaResult<Vec<Self>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, user_id, topic_suggestion_id, title, description, category, tags,
                   status, voice_type, custom_voice_settings, target_duration_minutes,
                   created_at, updated_at
            FROM projects
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated project if found, None otherwise
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidTransition` if the status change is not
    /// allowed from the stored status.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, user_id, topic_suggestion_id, title, description, category, tags,
                   status, voice_type, custom_voice_settings, target_duration_minutes,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut project) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(project));
        }

        let previous_status = project.status;
        data.apply_to(&mut project)?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET topic_suggestion_id = $2, title = $3, description = $4, category = $5,
                tags = $6, status = $7, voice_type = $8, custom_voice_settings = $9,
                target_duration_minutes = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, topic_suggestion_id, title, description, category, tags,
                      status, voice_type, custom_voice_settings, target_duration_minutes,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(project.topic_suggestion_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.category)
        .bind(&project.tags)
        .bind(project.status)
        .bind(project.voice_type)
        .bind(Json(&project.custom_voice_settings))
        .bind(project.target_duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if previous_status != project.status {
            tracing::info!(
                project_id = %id,
                from = previous_status.as_str(),
                to = project.status.as_str(),
                "Project status changed"
            );
        }

        Ok(Some(project))
    }

    /// Deletes a project with its scripts and audio files
    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> SchemaResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
