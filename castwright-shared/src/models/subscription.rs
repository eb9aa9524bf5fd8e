/// Subscription model and database operations
///
/// A record of the plan a user is (or was) on, with the limits and price
/// that applied. Payment-provider identifiers are stored opaquely; nothing
/// here talks to the provider or derives whether a subscription is in
/// force from its dates.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscriptions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     tier TEXT NOT NULL,
///     price_monthly NUMERIC(10, 2) NOT NULL,
///     currency CHAR(3) NOT NULL DEFAULT 'USD',
///     stripe_customer_id VARCHAR(255),
///     stripe_subscription_id VARCHAR(255),
///     monthly_project_limit INTEGER NOT NULL,
///     monthly_audio_minutes_limit NUMERIC(10, 2) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ,
///     cancelled_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::error::SchemaResult;
use crate::models::double_option;
use crate::models::user::UserTier;
use crate::validation::{validate_amount, validated, Payload, CURRENCY_REGEX};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Subscription record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: UserTier,

    /// Monthly price in `currency`, exact to the cent
    pub price_monthly: Decimal,

    /// Three-letter upper-case currency code
    pub currency: String,

    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,

    /// Projects the user may create per period
    pub monthly_project_limit: i32,

    /// Minutes of audio the user may generate per period
    pub monthly_audio_minutes_limit: Decimal,

    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

/// Input for creating a subscription
///
/// `started_at` defaults to now when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSubscription {
    pub user_id: Uuid,

    pub tier: UserTier,

    #[validate(custom(function = "validate_amount"))]
    pub price_monthly: Decimal,

    #[validate(regex(path = *CURRENCY_REGEX, message = "Currency must be three upper-case letters"))]
    #[serde(default = "default_currency")]
    pub currency: String,

    #[validate(length(max = 255, message = "Must be at most 255 characters"))]
    #[serde(default)]
    pub stripe_customer_id: Option<String>,

    #[validate(length(max = 255, message = "Must be at most 255 characters"))]
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub monthly_project_limit: i32,

    #[validate(custom(function = "validate_amount"))]
    pub monthly_audio_minutes_limit: Decimal,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Payload for CreateSubscription {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("tier", UserTier::VALUES)];
}

/// Input for updating a subscription
///
/// All fields are optional. Only non-None fields will be updated. Set
/// `cancelled_at` and `is_active` together to record a cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateSubscription {
    pub tier: Option<UserTier>,

    #[validate(custom(function = "validate_amount"))]
    pub price_monthly: Option<Decimal>,

    #[validate(regex(path = *CURRENCY_REGEX, message = "Currency must be three upper-case letters"))]
    pub currency: Option<String>,

    #[validate(length(max = 255, message = "Must be at most 255 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub stripe_customer_id: Option<Option<String>>,

    #[validate(length(max = 255, message = "Must be at most 255 characters"))]
    #[serde(default, deserialize_with = "double_option")]
    pub stripe_subscription_id: Option<Option<String>>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    pub monthly_project_limit: Option<i32>,

    #[validate(custom(function = "validate_amount"))]
    pub monthly_audio_minutes_limit: Option<Decimal>,

    pub is_active: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub cancelled_at: Option<Option<DateTime<Utc>>>,
}

impl Payload for UpdateSubscription {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("tier", UserTier::VALUES)];
}

impl UpdateSubscription {
    pub fn is_empty(&self) -> bool {
        *self == UpdateSubscription::default()
    }

    pub fn apply_to(&self, subscription: &mut Subscription) {
        if let Some(tier) = self.tier {
            subscription.tier = tier;
        }
        if let Some(price) = self.price_monthly {
            subscription.price_monthly = price;
        }
        if let Some(currency) = &self.currency {
            subscription.currency = currency.clone();
        }
        if let Some(customer) = &self.stripe_customer_id {
            subscription.stripe_customer_id = customer.clone();
        }
        if let Some(external) = &self.stripe_subscription_id {
            subscription.stripe_subscription_id = external.clone();
        }
        if let Some(limit) = self.monthly_project_limit {
            subscription.monthly_project_limit = limit;
        }
        if let Some(limit) = self.monthly_audio_minutes_limit {
            subscription.monthly_audio_minutes_limit = limit;
        }
        if let Some(is_active) = self.is_active {
            subscription.is_active = is_active;
        }
        if let Some(expires_at) = self.expires_at {
            subscription.expires_at = expires_at;
        }
        if let Some(cancelled_at) = self.cancelled_at {
            subscription.cancelled_at = cancelled_at;
        }
    }
}

impl Subscription {
    pub async fn create(pool: &PgPool, data: CreateSubscription) -> SchemaResult<Self> {
        let data = validated(data)?;

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (
                user_id, tier, price_monthly, currency, stripe_customer_id,
                stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                is_active, started_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()), $11)
            RETURNING id, user_id, tier, price_monthly, currency, stripe_customer_id,
                      stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                      is_active, started_at, expires_at, cancelled_at, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.tier)
        .bind(data.price_monthly)
        .bind(&data.currency)
        .bind(&data.stripe_customer_id)
        .bind(&data.stripe_subscription_id)
        .bind(data.monthly_project_limit)
        .bind(data.monthly_audio_minutes_limit)
        .bind(data.is_active)
        .bind(data.started_at)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            tier = subscription.tier.as_str(),
            "Created subscription"
        );

        Ok(subscription)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, tier, price_monthly, currency, stripe_customer_id,
                   stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                   is_active, started_at, expires_at, cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    /// Lists a user's subscriptions, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> SchemaResult<Vec<Self>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, tier, price_monthly, currency, stripe_customer_id,
                   stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                   is_active, started_at, expires_at, cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(subscriptions)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateSubscription,
    ) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, tier, price_monthly, currency, stripe_customer_id,
                   stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                   is_active, started_at, expires_at, cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut subscription) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(subscription));
        }

        data.apply_to(&mut subscription);

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET tier = $2, price_monthly = $3, currency = $4, stripe_customer_id = $5,
                stripe_subscription_id = $6, monthly_project_limit = $7,
                monthly_audio_minutes_limit = $8, is_active = $9, expires_at = $10,
                cancelled_at = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, tier, price_monthly, currency, stripe_customer_id,
                      stripe_subscription_id, monthly_project_limit, monthly_audio_minutes_limit,
                      is_active, started_at, expires_at, cancelled_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(subscription.tier)
        .bind(subscription.price_monthly)
        .bind(&subscription.currency)
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(subscription.monthly_project_limit)
        .bind(subscription.monthly_audio_minutes_limit)
        .bind(subscription.is_active)
        .bind(subscription.expires_at)
        .bind(subscription.cancelled_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(subscription))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
