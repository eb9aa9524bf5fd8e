/// Usage log model and database operations
///
/// Append-only record of user actions (project created, audio generated,
/// ...). Rows are never updated or deleted individually; they go away only
/// with their user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE usage_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     action VARCHAR(100) NOT NULL,
///     resource_type VARCHAR(50) NOT NULL,
///     resource_id UUID,
///     log_metadata JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::usage_log::{UsageLog, CreateUsageLog};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// UsageLog::create(&pool, CreateUsageLog {
///     user_id,
///     action: "project_created".to_string(),
///     resource_type: "project".to_string(),
///     resource_id: Some(project_id),
///     log_metadata: Default::default(),
/// }).await?;
///
/// let created = UsageLog::count_by_user_and_action(&pool, user_id, "project_created").await?;
/// # Ok(())
/// # }
/// ```

use crate::error::SchemaResult;
use crate::field_map::FieldMap;
use crate::validation::{validate_not_blank, validated, Payload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// A logged user action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,

    /// What happened, e.g. `audio_generated`
    pub action: String,

    /// Kind of entity acted on, e.g. `project`
    pub resource_type: String,

    /// The entity acted on, when there is one
    pub resource_id: Option<Uuid>,

    #[sqlx(json)]
    pub log_metadata: FieldMap,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a usage log entry
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUsageLog {
    pub user_id: Uuid,

    #[validate(
        length(min = 1, max = 100, message = "Action must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub action: String,

    #[validate(
        length(min = 1, max = 50, message = "Resource type must be 1-50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub resource_type: String,

    #[serde(default)]
    pub resource_id: Option<Uuid>,

    #[serde(default)]
    pub log_metadata: FieldMap,
}

impl Payload for CreateUsageLog {}

impl UsageLog {
    pub async fn create(pool: &PgPool, data: CreateUsageLog) -> SchemaResult<Self> {
        let data = validated(data)?;

        let entry = sqlx::query_as::<_, UsageLog>(
            r#"
            INSERT INTO usage_logs (user_id, action, resource_type, resource_id, log_metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, action, resource_type, resource_id, log_metadata, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(&data.action)
        .bind(&data.resource_type)
        .bind(data.resource_id)
        .bind(Json(&data.log_metadata))
        .fetch_one(pool)
        .await?;

        tracing::debug!(
            user_id = %entry.user_id,
            action = %entry.action,
            resource_type = %entry.resource_type,
            "Recorded usage"
        );

        Ok(entry)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let entry = sqlx::query_as::<_, UsageLog>(
            r#"
            SELECT id, user_id, action, resource_type, resource_id, log_metadata, created_at
            FROM usage_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Lists a user's log entries, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> SchemaResult<Vec<Self>> {
        let entries = sqlx::query_as::<_, UsageLog>(
            r#"
            SELECT id, user_id, action, resource_type, resource_id, log_metadata, created_at
            FROM usage_logs
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

        Ok(entries)
    }

    /// Counts how often a user performed an action
    pub async fn count_by_user_and_action(
        pool: &PgPool,
        user_id: Uuid,
        action: &str,
    ) -> SchemaResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM usage_logs WHERE user_id = $1 AND action = $2")
                .bind(user_id)
                .bind(action)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
