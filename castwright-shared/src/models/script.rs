/// Script model and database operations
///
/// Scripts are versioned per project. Exactly one version of a project is
/// current at any time once the project has scripts; creating a new script
/// makes it current unless asked otherwise, and [`Script::set_current`]
/// switches between existing versions. Both happen in a single transaction
/// and are backed by a partial unique index.
///
/// # State Machine
///
/// ```text
/// draft → ai_generated → user_edited → final
/// draft → user_edited
/// draft → final
/// ai_generated → final
/// final → user_edited
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE scripts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(200),
///     content TEXT NOT NULL,
///     sections JSONB NOT NULL DEFAULT '{}',
///     version INTEGER NOT NULL DEFAULT 1,
///     is_current BOOLEAN NOT NULL DEFAULT TRUE,
///     status TEXT NOT NULL DEFAULT 'draft',
///     word_count INTEGER NOT NULL DEFAULT 0,
///     estimated_duration_minutes NUMERIC(6, 2),
///     ai_model VARCHAR(100),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (project_id, version)
/// );
///
/// CREATE UNIQUE INDEX scripts_one_current_per_project ON scripts (project_id) WHERE is_current;
/// ```
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::script::{Script, CreateScript};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let v1 = Script::create(&pool, CreateScript::new(project_id, "Welcome to the show.")).await?;
/// let v2 = Script::create(&pool, CreateScript::new(project_id, "Welcome back to the show.")).await?;
/// assert_eq!(v2.version, v1.version + 1);
///
/// // Roll back to the first draft
/// Script::set_current(&pool, v1.id).await?;
/// # Ok(())
/// # }
/// ```

use crate::error::{SchemaError, SchemaResult};
use crate::field_map::FieldMap;
use crate::models::{check_transition, double_option, word_count, StatusMachine};
use crate::validation::{validate_duration_minutes, validated, Payload};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Editorial state of a script version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    #[default]
    Draft,

    /// Produced by a generation model, not yet reviewed
    AiGenerated,

    /// Changed by the user after generation or drafting
    UserEdited,

    /// Approved for narration
    Final,
}

impl ScriptStatus {
    pub const VALUES: &'static [&'static str] = &["draft", "ai_generated", "user_edited", "final"];
}

impl StatusMachine for ScriptStatus {
    const ENTITY: &'static str = "script";

    fn as_str(&self) -> &'static str {
        match self {
            ScriptStatus::Draft => "draft",
            ScriptStatus::AiGenerated => "ai_generated",
            ScriptStatus::UserEdited => "user_edited",
            ScriptStatus::Final => "final",
        }
    }

    fn can_transition_to(&self, target: ScriptStatus) -> bool {
        use ScriptStatus::*;

        matches!(
            (self, target),
            (Draft, AiGenerated)
                | (Draft, UserEdited)
                | (Draft, Final)
                | (AiGenerated, UserEdited)
                | (AiGenerated, Final)
                | (UserEdited, Final)
                // Reopened for edits
                | (Final, UserEdited)
        )
    }
}

/// One version of a project's script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Script {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: Option<String>,

    /// Full script text
    pub content: String,

    /// Structured outline (intro, segments, outro, ...)
    #[sqlx(json)]
    pub sections: FieldMap,

    /// 1-based, unique within the project
    pub version: i32,

    /// Whether this is the version used for narration
    pub is_current: bool,

    pub status: ScriptStatus,

    /// Whitespace-separated words in `content`, kept in sync on every write
    pub word_count: i32,

    pub estimated_duration_minutes: Option<Decimal>,

    /// Name of the model that generated the text, if any
    pub ai_model: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input for creating a script version
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateScript {
    pub project_id: Uuid,

    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,

    #[serde(default)]
    pub sections: FieldMap,

    /// Explicit version number; the next free number is used when absent
    #[validate(range(min = 1, message = "Version must be at least 1"))]
    #[serde(default)]
    pub version: Option<i32>,

    /// Make this the project's current script (default true)
    #[serde(default = "default_true")]
    pub is_current: bool,

    #[serde(default)]
    pub status: ScriptStatus,

    #[validate(custom(function = "validate_duration_minutes"))]
    #[serde(default)]
    pub estimated_duration_minutes: Option<Decimal>,

    #[validate(length(max = 100, message = "AI model must be at most 100 characters"))]
    #[serde(default)]
    pub ai_model: Option<String>,
}

impl Payload for CreateScript {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("status", ScriptStatus::VALUES)];
}

impl CreateScript {
    /// A current draft with the next free version number
    pub fn new(project_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            project_id,
            title: None,
            content: content.into(),
            sections: FieldMap::new(),
            version: None,
            is_current: true,
            status: ScriptStatus::Draft,
            estimated_duration_minutes: None,
            ai_model: None,
        }
    }
}

/// Input for updating a script version
///
/// All fields are optional. Only non-None fields will be updated. Version
/// and project are fixed; use [`Script::set_current`] to change which
/// version is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateScript {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,

    pub sections: Option<FieldMap>,

    pub status: Option<ScriptStatus>,

    #[validate(custom(function = "validate_duration_minutes"))]
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_duration_minutes: Option<Option<Decimal>>,

    #[validate(length(max = 100, message = "AI model must be at most 100 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub ai_model: Option<Option<String>>,
}

impl Payload for UpdateScript {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("status", ScriptStatus::VALUES)];
}

impl UpdateScript {
    pub fn is_empty(&self) -> bool {
        *self == UpdateScript::default()
    }

    /// Applies the patch, recounting words when the content changes
    pub fn apply_to(&self, script: &mut Script) -> SchemaResult<()> {
        if let Some(status) = self.status {
            check_transition(script.status, status)?;
            script.status = status;
        }
        if let Some(title) = &self.title {
            script.title = title.clone();
        }
        if let Some(content) = &self.content {
            script.content = content.clone();
            script.word_count = word_count(content);
        }
        if let Some(sections) = &self.sections {
            script.sections = sections.clone();
        }
        if let Some(duration) = self.estimated_duration_minutes {
            script.estimated_duration_minutes = duration;
        }
        if let Some(ai_model) = &self.ai_model {
            script.ai_model = ai_model.clone();
        }
        Ok(())
    }
}

impl Script {
    /// Creates a new script version
    ///
    /// The project row is locked for the duration so concurrent creates get
    /// distinct version numbers. When `is_current` is set, the previously
    /// current version of the project is demoted in the same transaction.
    ///
    /// # Errors
    ///
    /// - `SchemaError::MissingReference` if the project does not exist
    /// - `SchemaError::Conflict` on `version` if that number is taken
    pub async fn create(pool: &PgPool, data: CreateScript) -> SchemaResult<Self> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let project: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
                .bind(data.project_id)
                .fetch_optional(&mut *tx)
                .await?;
        if project.is_none() {
            return Err(SchemaError::MissingReference {
                field: "project_id".to_string(),
            });
        }

        let version = match data.version {
            Some(version) => version,
            None => {
                let (next,): (i32,) = sqlx::query_as(
                    "SELECT COALESCE(MAX(version), 0) + 1 FROM scripts WHERE project_id = $1",
                )
                .bind(data.project_id)
                .fetch_one(&mut *tx)
                .await?;
                next
            }
        };

        if data.is_current {
            sqlx::query("UPDATE scripts SET is_current = FALSE, updated_at = NOW() WHERE project_id = $1 AND is_current")
                .bind(data.project_id)
                .execute(&mut *tx)
                .await?;
        }

        let script = sqlx::query_as::<_, Script>(
            r#"
            INSERT INTO scripts (
                project_id, title, content, sections, version, is_current, status,
                word_count, estimated_duration_minutes, ai_model
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, project_id, title, content, sections, version, is_current, status,
                      word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(Json(&data.sections))
        .bind(version)
        .bind(data.is_current)
        .bind(data.status)
        .bind(word_count(&data.content))
        .bind(data.estimated_duration_minutes)
        .bind(&data.ai_model)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            script_id = %script.id,
            project_id = %script.project_id,
            version = script.version,
            is_current = script.is_current,
            "Created script"
        );

        Ok(script)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let script = sqlx::query_as::<_, Script>(
            r#"
            SELECT id, project_id, title, content, sections, version, is_current, status,
                   word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            FROM scripts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(script)
    }

    /// Lists every version of a project's script, oldest version first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> SchemaResult<Vec<Self>> {
        let scripts = sqlx::query_as::<_, Script>(
            r#"
            SELECT id, project_id, title, content, sections, version, is_current, status,
                   word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            FROM scripts
            WHERE project_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(scripts)
    }

    /// Finds the current script of a project
    pub async fn find_current(pool: &PgPool, project_id: Uuid) -> SchemaResult<Option<Self>> {
        let script = sqlx::query_as::<_, Script>(
            r#"
            SELECT id, project_id, title, content, sections, version, is_current, status,
                   word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            FROM scripts
            WHERE project_id = $1 AND is_current
            "#,
        )
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(script)
    }

    /// Makes a script the current version of its project
    ///
    /// # Returns
    ///
    /// The now-current script, None if it doesn't exist
    pub async fn set_current(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let mut tx = pool.begin().await?;

        let owner: Option<(Uuid,)> = sqlx::query_as("SELECT project_id FROM scripts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((project_id,)) = owner else {
            return Ok(None);
        };

        // Same lock order as create: project first, then its scripts
        sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let target: Option<(bool,)> =
            sqlx::query_as("SELECT is_current FROM scripts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((already_current,)) = target else {
            return Ok(None);
        };

        if !already_current {
            sqlx::query("UPDATE scripts SET is_current = FALSE, updated_at = NOW() WHERE project_id = $1 AND is_current")
                .bind(project_id)
                .execute(&mut *tx)
                .await?;
        }

        let script = sqlx::query_as::<_, Script>(
            r#"
            UPDATE scripts
            SET is_current = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, title, content, sections, version, is_current, status,
                      word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            script_id = %id,
            project_id = %project_id,
            version = script.version,
            "Switched current script"
        );

        Ok(Some(script))
    }

    /// Applies a partial update
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidTransition` if the status change is not
    /// allowed from the stored status.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateScript) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Script>(
            r#"
            SELECT id, project_id, title, content, sections, version, is_current, status,
                   word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            FROM scripts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut script) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(script));
        }

        data.apply_to(&mut script)?;

        let script = sqlx::query_as::<_, Script>(
            r#"
            UPDATE scripts
            SET title = $2, content = $3, sections = $4, status = $5, word_count = $6,
                estimated_duration_minutes = $7, ai_model = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, title, content, sections, version, is_current, status,
                      word_count, estimated_duration_minutes, ai_model, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&script.title)
        .bind(&script.content)
        .bind(Json(&script.sections))
        .bind(script.status)
        .bind(script.word_count)
        .bind(script.estimated_duration_minutes)
        .bind(&script.ai_model)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(script))
    }

    /// Deletes a script version
    ///
    /// Deleting the current version leaves the project without a current
    /// script until another one is selected. Audio rendered from it keeps
    /// existing with no script reference.
    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM scripts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::from_json;
    use serde_json::json;

    fn sample_script() -> Script {
        Script {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: Some("Episode 1".to_string()),
            content: "Welcome to the show".to_string(),
            sections: FieldMap::new(),
            version: 1,
            is_current: true,
            status: ScriptStatus::AiGenerated,
            word_count: 4,
            estimated_duration_minutes: None,
            ai_model: Some("gpt-4".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_script_defaults() {
        let data: CreateScript = from_json(json!({
            "project_id": Uuid::new_v4(),
            "content": "Hello and welcome."
        }))
        .unwrap();

        assert!(data.is_current);
        assert!(data.version.is_none());
        assert_eq!(data.status, ScriptStatus::Draft);
        assert!(data.sections.is_empty());
    }

    #[test]
    fn test_create_script_rejects_empty_content_and_zero_version() {
        let err = from_json::<CreateScript>(json!({
            "project_id": Uuid::new_v4(),
            "content": "",
            "version": 0
        }))
        .unwrap_err();

        let fields: Vec<_> = err.violations().unwrap().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["content", "version"]);
    }

    #[test]
    fn test_content_update_recounts_words() {
        let mut script = sample_script();
        let patch = UpdateScript {
            content: Some("Welcome back to the show, everyone".to_string()),
            status: Some(ScriptStatus::UserEdited),
            ..Default::default()
        };
        patch.apply_to(&mut script).unwrap();

        assert_eq!(script.word_count, 6);
        assert_eq!(script.status, ScriptStatus::UserEdited);
        assert_eq!(script.version, 1);
    }

    #[test]
    fn test_script_transitions() {
        use ScriptStatus::*;

        assert!(Draft.can_transition_to(AiGenerated));
        assert!(AiGenerated.can_transition_to(Final));
        assert!(Final.can_transition_to(UserEdited));
        assert!(!Final.can_transition_to(Draft));
        assert!(!UserEdited.can_transition_to(AiGenerated));

        let mut script = sample_script();
        script.status = Final;
        let err = UpdateScript {
            status: Some(Draft),
            ..Default::default()
        }
        .apply_to(&mut script)
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid script status transition: final -> draft");
    }

    #[test]
    fn test_clear_ai_model() {
        let mut script = sample_script();
        let patch: UpdateScript = from_json(json!({ "ai_model": null })).unwrap();
        patch.apply_to(&mut script).unwrap();
        assert!(script.ai_model.is_none());
        assert_eq!(script.title.as_deref(), Some("Episode 1"));
    }
}
