/// Database models for Castwright
///
/// This module contains all entities, their create/update shapes and their
/// CRUD operations.
///
/// # Models
///
/// - `task`: To-do list items (independent of the content pipeline)
/// - `user`: Accounts with tier and monthly usage counters
/// - `topic_suggestion`: Suggested content topics
/// - `project`: A piece of audio content owned by a user
/// - `script`: Versioned scripts of a project
/// - `audio_file`: Generated audio and its enhanced derivatives
/// - `subscription`: Billing plan records per user
/// - `usage_log`: Append-only action log
/// - `voice`: Voice presets shared by projects and audio files
///
/// # Example
///
/// ```no_run
/// use castwright_shared::models::user::{User, CreateUser};
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser::new("host@example.com", "host", "$argon2id$...");
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod audio_file;
pub mod project;
pub mod script;
pub mod subscription;
pub mod task;
pub mod topic_suggestion;
pub mod usage_log;
pub mod user;
pub mod voice;

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Deserializer};

/// A status enum with an allowed-transition table
pub trait StatusMachine: Copy + PartialEq {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    fn as_str(&self) -> &'static str;

    /// Whether moving from `self` to `target` is a legal step
    fn can_transition_to(&self, target: Self) -> bool;
}

/// Rejects illegal status changes; keeping the current status is always allowed
pub fn check_transition<S: StatusMachine>(from: S, to: S) -> SchemaResult<()> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SchemaError::InvalidTransition {
            entity: S::ENTITY,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// Deserializes a clearable patch field
///
/// Absent key -> `None` (keep), `null` -> `Some(None)` (clear),
/// value -> `Some(Some(v))` (set). Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Counts whitespace-separated words
pub(crate) fn word_count(text: &str) -> i32 {
    text.split_whitespace().count().min(i32::MAX as usize) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  hello   world \n again "), 3);
    }
}
