/// Topic suggestion model and database operations
///
/// Curated ideas a user can start a project from. Projects keep a weak
/// reference: deleting a topic leaves its projects in place.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE topic_suggestions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     description VARCHAR(2000),
///     category VARCHAR(100) NOT NULL,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     popularity_score NUMERIC(5, 2) NOT NULL DEFAULT 0,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::error::SchemaResult;
use crate::models::double_option;
use crate::validation::{validate_not_blank, validate_popularity, validate_tags, validated, Payload};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// A suggested content topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicSuggestion {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub tags: Vec<String>,

    /// 0-100, higher sorts first
    pub popularity_score: Decimal,

    /// Inactive topics are hidden from category listings
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input for creating a topic suggestion
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTopicSuggestion {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    #[validate(
        length(min = 1, max = 100, message = "Category must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub category: String,

    #[validate(custom(function = "validate_tags"))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(custom(function = "validate_popularity"))]
    #[serde(default)]
    pub popularity_score: Decimal,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Payload for CreateTopicSuggestion {}

/// Input for updating a topic suggestion
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateTopicSuggestion {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    /// Use Some(None) to clear
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[validate(
        length(min = 1, max = 100, message = "Category must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub category: Option<String>,

    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,

    #[validate(custom(function = "validate_popularity"))]
    pub popularity_score: Option<Decimal>,

    pub is_active: Option<bool>,
}

impl Payload for UpdateTopicSuggestion {}

impl UpdateTopicSuggestion {
    pub fn is_empty(&self) -> bool {
        *self == UpdateTopicSuggestion::default()
    }

    pub fn apply_to(&self, topic: &mut TopicSuggestion) {
        if let Some(title) = &self.title {
            topic.title = title.clone();
        }
        if let Some(description) = &self.description {
            topic.description = description.clone();
        }
        if let Some(category) = &self.category {
            topic.category = category.clone();
        }
        if let Some(tags) = &self.tags {
            topic.tags = tags.clone();
        }
        if let Some(score) = self.popularity_score {
            topic.popularity_score = score;
        }
        if let Some(is_active) = self.is_active {
            topic.is_active = is_active;
        }
    }
}

impl TopicSuggestion {
    pub async fn create(pool: &PgPool, data: CreateTopicSuggestion) -> SchemaResult<Self> {
        let data = validated(data)?;

        let topic = sqlx::query_as::<_, TopicSuggestion>(
            r#"
            INSERT INTO topic_suggestions (title, description, category, tags, popularity_score, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, category, tags, popularity_score, is_active, created_at
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.tags)
        .bind(data.popularity_score)
        .bind(data.is_active)
        .fetch_one(pool)
        .await?;

        Ok(topic)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let topic = sqlx::query_as::<_, TopicSuggestion>(
            r#"
            SELECT id, title, description, category, tags, popularity_score, is_active, created_at
            FROM topic_suggestions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(topic)
    }

    /// Lists active topics in a category, most popular first
    pub async fn list_by_category(
        pool: &PgPool,
        category: &str,
        limit: i64,
    ) -> SchemaResult<Vec<Self>> {
        let topics = sqlx::query_as::<_, TopicSuggestion>(
            r#"
            SELECT id, title, description, category, tags, popularity_score, is_active, created_at
            FROM topic_suggestions
            WHERE category = $1 AND is_active
            ORDER BY popularity_score DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(category)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(topics)
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated topic if found, None otherwise
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTopicSuggestion,
    ) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, TopicSuggestion>(
            r#"
            SELECT id, title, description, category, tags, popularity_score, is_active, created_at
            FROM topic_suggestions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut topic) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(topic));
        }

        data.apply_to(&mut topic);

        let topic = sqlx::query_as::<_, TopicSuggestion>(
            r#"
            UPDATE topic_suggestions
            SET title = $2, description = $3, category = $4, tags = $5,
                popularity_score = $6, is_active = $7
            WHERE id = $1
            RETURNING id, title, description, category, tags, popularity_score, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(&topic.category)
        .bind(&topic.tags)
        .bind(topic.popularity_score)
        .bind(topic.is_active)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(topic))
    }

    /// Deletes a topic; projects that referenced it keep existing with no topic
    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM topic_suggestions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
