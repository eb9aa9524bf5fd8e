/// Task model and database operations
///
/// A minimal to-do list item. Tasks are independent of the content
/// pipeline tables.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::task::{Task, CreateTask, UpdateTask};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask { title: "Record intro".to_string() }).await?;
/// assert!(!task.completed);
///
/// let done = UpdateTask { completed: Some(true), ..Default::default() };
/// Task::update(&pool, task.id, done).await?;
/// # Ok(())
/// # }
/// ```

use crate::error::SchemaResult;
use crate::validation::{validated, Payload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

/// A to-do list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct Task {
    /// Auto-assigned identity
    pub id: i64,

    /// What needs doing (1-200 characters)
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    /// Whether the task is done
    #[serde(default)]
    pub completed: bool,

    /// When the task was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new task
///
/// New tasks always start out not completed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
}

impl Payload for CreateTask {}

/// Input for updating an existing task
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateTask {
    /// New title
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    /// New completion state
    pub completed: Option<bool>,
}

impl Payload for UpdateTask {}

impl UpdateTask {
    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Applies the patch to an in-memory task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

impl Task {
    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns a validation error if the title is empty or longer than 200
    /// characters, or a database error.
    pub async fn create(pool: &PgPool, data: CreateTask) -> SchemaResult<Self> {
        let data = validated(data)?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title)
            VALUES ($1)
            RETURNING id, title, completed, created_at
            "#,
        )
        .bind(data.title)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> SchemaResult<Option<Self>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, completed, created_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> SchemaResult<Vec<Self>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, completed, created_at
            FROM tasks
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies a partial update
    ///
    /// Absent fields keep their stored value; an empty patch returns the
    /// task unchanged.
    ///
    /// # Returns
    ///
    /// The updated task if found, None if the task doesn't exist
    pub async fn update(pool: &PgPool, id: i64, data: UpdateTask) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                completed = COALESCE($3, completed)
            WHERE id = $1
            RETURNING id, title, completed, created_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.completed)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task by ID
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all tasks
    pub async fn count(pool: &PgPool) -> SchemaResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
