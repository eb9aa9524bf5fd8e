/// User model and database operations
///
/// Accounts that own projects, subscriptions and usage logs. The account's
/// tier and its monthly usage counters live on the row; nothing here
/// enforces limits against them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     username VARCHAR(50) NOT NULL UNIQUE,
///     full_name VARCHAR(100),
///     password_hash VARCHAR(255) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     tier TEXT NOT NULL DEFAULT 'free',
///     preferences JSONB NOT NULL DEFAULT '{}',
///     monthly_projects_created INTEGER NOT NULL DEFAULT 0,
///     monthly_audio_minutes NUMERIC(10, 2) NOT NULL DEFAULT 0,
///     monthly_reset_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX users_email_key ON users (lower(email));
/// ```
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::user::{User, CreateUser, UpdateUser, UserTier};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser::new("host@example.com", "host", "$argon2id$...")).await?;
/// assert_eq!(user.tier, UserTier::Free);
///
/// // Upgrade
/// let update = UpdateUser { tier: Some(UserTier::Premium), ..Default::default() };
/// User::update(&pool, user.id, update).await?;
///
/// // Find by email
/// let found = User::find_by_email(&pool, "host@example.com").await?;
/// # Ok(())
/// # }
/// ```

use crate::error::SchemaResult;
use crate::field_map::FieldMap;
use crate::models::double_option;
use crate::validation::{validate_amount, validated, Payload, EMAIL_REGEX, USERNAME_REGEX};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Account tier
///
/// Also used as the plan of a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    #[default]
    Free,
    Premium,
    Professional,
}

impl UserTier {
    /// Every accepted value, in declaration order
    pub const VALUES: &'static [&'static str] = &["free", "premium", "professional"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserTier::Free => "free",
            UserTier::Premium => "premium",
            UserTier::Professional => "professional",
        }
    }
}

fn default_true() -> bool {
    true
}

/// User model representing an account
///
/// Passwords are stored as hashes supplied by the caller, never in plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address
    ///
    /// Must be unique across all users
    pub email: String,

    /// Public handle (3-50 characters of letters, digits, `_` and `-`)
    ///
    /// Must be unique across all users
    pub username: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Password hash (never plaintext)
    pub password_hash: String,

    /// Disabled accounts keep their data but should not sign in
    pub is_active: bool,

    /// Account tier
    pub tier: UserTier,

    /// Free-form UI and generation preferences
    #[sqlx(json)]
    pub preferences: FieldMap,

    /// Projects created since `monthly_reset_date`
    pub monthly_projects_created: i32,

    /// Minutes of audio generated since `monthly_reset_date`
    pub monthly_audio_minutes: Decimal,

    /// Start of the current usage period
    pub monthly_reset_date: DateTime<Utc>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
///
/// Email, username and password_hash are required. Everything else falls
/// back to the column defaults; usage counters always start at zero.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(
        length(max = 255, message = "Email must be at most 255 characters"),
        regex(path = *EMAIL_REGEX, message = "Email must look like local@domain.tld")
    )]
    pub email: String,

    #[validate(
        length(min = 3, max = 50, message = "Username must be 3-50 characters"),
        regex(path = *USERNAME_REGEX, message = "Username may only contain letters, digits, '_' and '-'")
    )]
    pub username: String,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    #[serde(default)]
    pub full_name: Option<String>,

    /// Password hash (NOT plaintext password!)
    #[validate(length(min = 1, max = 255, message = "Password hash must be 1-255 characters"))]
    pub password_hash: String,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub tier: UserTier,

    #[serde(default)]
    pub preferences: FieldMap,
}

impl Payload for CreateUser {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("tier", UserTier::VALUES)];
}

impl CreateUser {
    /// Creates an active free-tier account shape with no preferences
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            full_name: None,
            password_hash: password_hash.into(),
            is_active: true,
            tier: UserTier::Free,
            preferences: FieldMap::new(),
        }
    }
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(
        length(max = 255, message = "Email must be at most 255 characters"),
        regex(path = *EMAIL_REGEX, message = "Email must look like local@domain.tld")
    )]
    pub email: Option<String>,

    #[validate(
        length(min = 3, max = 50, message = "Username must be 3-50 characters"),
        regex(path = *USERNAME_REGEX, message = "Username may only contain letters, digits, '_' and '-'")
    )]
    pub username: Option<String>,

    /// New display name (use Some(None) to clear)
    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,

    #[validate(length(min = 1, max = 255, message = "Password hash must be 1-255 characters"))]
    pub password_hash: Option<String>,

    pub is_active: Option<bool>,

    pub tier: Option<UserTier>,

    /// Replaces the whole preferences bag
    pub preferences: Option<FieldMap>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub monthly_projects_created: Option<i32>,

    #[validate(custom(function = "validate_amount"))]
    pub monthly_audio_minutes: Option<Decimal>,

    pub monthly_reset_date: Option<DateTime<Utc>>,
}

impl Payload for UpdateUser {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("tier", UserTier::VALUES)];
}

impl UpdateUser {
    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == UpdateUser::default()
    }

    /// Applies the patch to an in-memory user
    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(tier) = self.tier {
            user.tier = tier;
        }
        if let Some(preferences) = &self.preferences {
            user.preferences = preferences.clone();
        }
        if let Some(count) = self.monthly_projects_created {
            user.monthly_projects_created = count;
        }
        if let Some(minutes) = self.monthly_audio_minutes {
            user.monthly_audio_minutes = minutes;
        }
        if let Some(reset) = self.monthly_reset_date {
            user.monthly_reset_date = reset;
        }
    }
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A field fails validation (`SchemaError::Validation`)
    /// - Email or username already exists (`SchemaError::Conflict`)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> SchemaResult<Self> {
        let data = validated(data)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, full_name, password_hash, is_active, tier, preferences)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, username, full_name, password_hash, is_active, tier, preferences,
                      monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                      created_at, updated_at
            "#,
        )
        .bind(&data.email)
        .bind(&data.username)
        .bind(&data.full_name)
        .bind(&data.password_hash)
        .bind(data.is_active)
        .bind(data.tier)
        .bind(Json(&data.preferences))
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Created user");

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, full_name, password_hash, is_active, tier, preferences,
                   monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> SchemaResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, full_name, password_hash, is_active, tier, preferences,
                   monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                   created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by username (exact match)
    pub async fn find_by_username(pool: &PgPool, username: &str) -> SchemaResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, full_name, password_hash, is_active, tier, preferences,
                   monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                   created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are changed. The row is locked while the
    /// patch is applied and `updated_at` is set to the current time.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Conflict` if the new email or username belongs to
    /// another user.
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateUser) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, full_name, password_hash, is_active, tier, preferences,
                   monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut user) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(user));
        }

        data.apply_to(&mut user);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, username = $3, full_name = $4, password_hash = $5,
                is_active = $6, tier = $7, preferences = $8,
                monthly_projects_created = $9, monthly_audio_minutes = $10,
                monthly_reset_date = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, username, full_name, password_hash, is_active, tier, preferences,
                      monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.tier)
        .bind(Json(&user.preferences))
        .bind(user.monthly_projects_created)
        .bind(user.monthly_audio_minutes)
        .bind(user.monthly_reset_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(user))
    }

    /// Deletes a user by ID
    ///
    /// Projects, subscriptions and usage logs of the user are deleted with it.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id = %id, "Deleted user");
        }

        Ok(result.rows_affected() > 0)
    }

    /// Lists users with pagination, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> SchemaResult<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, full_name, password_hash, is_active, tier, preferences,
                   monthly_projects_created, monthly_audio_minutes, monthly_reset_date,
                   created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> SchemaResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
