/// Audio file model and database operations
///
/// An audio file is a rendering of a project, usually from one of its
/// scripts. Enhanced renderings point back at the file they were derived
/// from through `original_file_id`; that reference is a plain lookup key, so
/// the enhanced versions of a file are found with
/// [`AudioFile::list_enhanced_versions`] rather than held by the original.
///
/// # State Machine
///
/// ```text
/// pending → processing → completed
/// pending → failed
/// processing → failed
/// failed → pending (retry)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audio_files (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     script_id UUID REFERENCES scripts(id) ON DELETE SET NULL,
///     original_file_id UUID REFERENCES audio_files(id) ON DELETE SET NULL,
///     file_name VARCHAR(255) NOT NULL,
///     file_path VARCHAR(1000) NOT NULL,
///     file_size_bytes BIGINT,
///     duration_seconds NUMERIC(10, 2),
///     format VARCHAR(10) NOT NULL DEFAULT 'mp3',
///     voice_type TEXT NOT NULL DEFAULT 'male_professional',
///     voice_settings JSONB NOT NULL DEFAULT '{}',
///     speed NUMERIC(3, 2) NOT NULL DEFAULT 1.00,
///     pitch NUMERIC(3, 2) NOT NULL DEFAULT 1.00,
///     is_enhanced BOOLEAN NOT NULL DEFAULT FALSE,
///     enhancement_settings JSONB NOT NULL DEFAULT '{}',
///     status TEXT NOT NULL DEFAULT 'pending',
///     error_message TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (original_file_id IS NULL OR original_file_id <> id)
/// );
/// ```

use crate::error::{SchemaError, SchemaResult};
use crate::field_map::FieldMap;
use crate::models::voice::VoiceType;
use crate::models::{check_transition, double_option, StatusMachine};
use crate::validation::{validate_amount, validate_multiplier, validated, Payload};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

/// Processing state of an audio file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    /// Queued for rendering
    #[default]
    Pending,

    /// Rendering or enhancement in progress
    Processing,

    /// File is ready
    Completed,

    /// Rendering failed, see `error_message`
    Failed,
}

impl AudioStatus {
    pub const VALUES: &'static [&'static str] = &["pending", "processing", "completed", "failed"];

    /// Checks if the file has finished processing successfully
    pub fn is_terminal(&self) -> bool {
        matches!(self, AudioStatus::Completed)
    }
}

impl StatusMachine for AudioStatus {
    const ENTITY: &'static str = "audio file";

    fn as_str(&self) -> &'static str {
        match self {
            AudioStatus::Pending => "pending",
            AudioStatus::Processing => "processing",
            AudioStatus::Completed => "completed",
            AudioStatus::Failed => "failed",
        }
    }

    fn can_transition_to(&self, target: AudioStatus) -> bool {
        match (self, target) {
            (AudioStatus::Pending, AudioStatus::Processing) => true,
            (AudioStatus::Pending, AudioStatus::Failed) => true,

            (AudioStatus::Processing, AudioStatus::Completed) => true,
            (AudioStatus::Processing, AudioStatus::Failed) => true,

            // Retry
            (AudioStatus::Failed, AudioStatus::Pending) => true,

            // Completed files are immutable renderings
            _ => false,
        }
    }
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_multiplier() -> Decimal {
    Decimal::new(100, 2)
}

/// A rendered or enhanced audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AudioFile {
    pub id: Uuid,
    pub project_id: Uuid,

    /// Script the audio was rendered from (cleared if the script is deleted)
    pub script_id: Option<Uuid>,

    /// File this one was enhanced from (cleared if the original is deleted)
    pub original_file_id: Option<Uuid>,

    pub file_name: String,

    /// Storage location (path or object key)
    pub file_path: String,

    pub file_size_bytes: Option<i64>,
    pub duration_seconds: Option<Decimal>,

    /// Container/codec short name, e.g. `mp3`, `wav`
    pub format: String,

    pub voice_type: VoiceType,

    #[sqlx(json)]
    pub voice_settings: FieldMap,

    /// Playback speed multiplier, 0.50-2.00
    pub speed: Decimal,

    /// Pitch multiplier, 0.50-2.00
    pub pitch: Decimal,

    pub is_enhanced: bool,

    #[sqlx(json)]
    pub enhancement_settings: FieldMap,

    pub status: AudioStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering an audio file
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAudioFile {
    pub project_id: Uuid,

    #[serde(default)]
    pub script_id: Option<Uuid>,

    #[serde(default)]
    pub original_file_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub file_name: String,

    #[validate(length(min = 1, max = 1000, message = "File path must be 1-1000 characters"))]
    pub file_path: String,

    #[validate(range(min = 0, message = "Must not be negative"))]
    #[serde(default)]
    pub file_size_bytes: Option<i64>,

    #[validate(custom(function = "validate_amount"))]
    #[serde(default)]
    pub duration_seconds: Option<Decimal>,

    #[validate(length(min = 1, max = 10, message = "Format must be 1-10 characters"))]
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub voice_type: VoiceType,

    #[serde(default)]
    pub voice_settings: FieldMap,

    #[validate(custom(function = "validate_multiplier"))]
    #[serde(default = "default_multiplier")]
    pub speed: Decimal,

    #[validate(custom(function = "validate_multiplier"))]
    #[serde(default = "default_multiplier")]
    pub pitch: Decimal,

    #[serde(default)]
    pub is_enhanced: bool,

    #[serde(default)]
    pub enhancement_settings: FieldMap,

    #[serde(default)]
    pub status: AudioStatus,

    #[serde(default)]
    pub error_message: Option<String>,
}

impl Payload for CreateAudioFile {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[
        ("voice_type", VoiceType::VALUES),
        ("status", AudioStatus::VALUES),
    ];
}

impl CreateAudioFile {
    /// A pending mp3 rendering with default voice parameters
    pub fn new(project_id: Uuid, file_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            project_id,
            script_id: None,
            original_file_id: None,
            file_name: file_name.into(),
            file_path: file_path.into(),
            file_size_bytes: None,
            duration_seconds: None,
            format: default_format(),
            voice_type: VoiceType::default(),
            voice_settings: FieldMap::new(),
            speed: default_multiplier(),
            pitch: default_multiplier(),
            is_enhanced: false,
            enhancement_settings: FieldMap::new(),
            status: AudioStatus::Pending,
            error_message: None,
        }
    }
}

/// Input for updating an audio file
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateAudioFile {
    #[serde(default, deserialize_with = "double_option")]
    pub script_id: Option<Option<Uuid>>,

    /// Must not point at the file itself or at one of its enhanced descendants
    #[serde(default, deserialize_with = "double_option")]
    pub original_file_id: Option<Option<Uuid>>,

    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub file_name: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "File path must be 1-1000 characters"))]
    pub file_path: Option<String>,

    #[validate(range(min = 0, message = "Must not be negative"))]
    #[serde(default, deserialize_with = "double_option")]
    pub file_size_bytes: Option<Option<i64>>,

    #[validate(custom(function = "validate_amount"))]
    #[serde(default, deserialize_with = "double_option")]
    pub duration_seconds: Option<Option<Decimal>>,

    #[validate(length(min = 1, max = 10, message = "Format must be 1-10 characters"))]
    pub format: Option<String>,

    pub voice_type: Option<VoiceType>,

    pub voice_settings: Option<FieldMap>,

    #[validate(custom(function = "validate_multiplier"))]
    pub speed: Option<Decimal>,

    #[validate(custom(function = "validate_multiplier"))]
    pub pitch: Option<Decimal>,

    pub is_enhanced: Option<bool>,

    pub enhancement_settings: Option<FieldMap>,

    pub status: Option<AudioStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub error_message: Option<Option<String>>,
}

impl Payload for UpdateAudioFile {
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[
        ("voice_type", VoiceType::VALUES),
        ("status", AudioStatus::VALUES),
    ];
}

impl UpdateAudioFile {
    pub fn is_empty(&self) -> bool {
        *self == UpdateAudioFile::default()
    }

    /// Applies the patch to an in-memory audio file
    ///
    /// Rejects a file naming itself as its original and illegal status
    /// changes before anything is modified.
    pub fn apply_to(&self, audio: &mut AudioFile) -> SchemaResult<()> {
        if self.original_file_id == Some(Some(audio.id)) {
            return Err(SchemaError::violation(
                "original_file_id",
                "self_reference",
                "An audio file cannot be its own original",
            ));
        }
        if let Some(status) = self.status {
            check_transition(audio.status, status)?;
            audio.status = status;
        }
        if let Some(script_id) = self.script_id {
            audio.script_id = script_id;
        }
        if let Some(original) = self.original_file_id {
            audio.original_file_id = original;
        }
        if let Some(file_name) = &self.file_name {
            audio.file_name = file_name.clone();
        }
        if let Some(file_path) = &self.file_path {
            audio.file_path = file_path.clone();
        }
        if let Some(size) = self.file_size_bytes {
            audio.file_size_bytes = size;
        }
        if let Some(duration) = self.duration_seconds {
            audio.duration_seconds = duration;
        }
        if let Some(format) = &self.format {
            audio.format = format.clone();
        }
        if let Some(voice_type) = self.voice_type {
            audio.voice_type = voice_type;
        }
        if let Some(settings) = &self.voice_settings {
            audio.voice_settings = settings.clone();
        }
        if let Some(speed) = self.speed {
            audio.speed = speed;
        }
        if let Some(pitch) = self.pitch {
            audio.pitch = pitch;
        }
        if let Some(is_enhanced) = self.is_enhanced {
            audio.is_enhanced = is_enhanced;
        }
        if let Some(settings) = &self.enhancement_settings {
            audio.enhancement_settings = settings.clone();
        }
        if let Some(message) = &self.error_message {
            audio.error_message = message.clone();
        }
        Ok(())
    }
}

impl AudioFile {
    /// Registers a new audio file
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::MissingReference` if the project, script or
    /// original file does not exist.
    pub async fn create(pool: &PgPool, data: CreateAudioFile) -> SchemaResult<Self> {
        let data = validated(data)?;

        let audio = sqlx::query_as::<_, AudioFile>(
            r#"
            INSERT INTO audio_files (
                project_id, script_id, original_file_id, file_name, file_path,
                file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                speed, pitch, is_enhanced, enhancement_settings, status, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id, project_id, script_id, original_file_id, file_name, file_path,
                      file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                      speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                      created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.script_id)
        .bind(data.original_file_id)
        .bind(&data.file_name)
        .bind(&data.file_path)
        .bind(data.file_size_bytes)
        .bind(data.duration_seconds)
        .bind(&data.format)
        .bind(data.voice_type)
        .bind(Json(&data.voice_settings))
        .bind(data.speed)
        .bind(data.pitch)
        .bind(data.is_enhanced)
        .bind(Json(&data.enhancement_settings))
        .bind(data.status)
        .bind(&data.error_message)
        .fetch_one(pool)
        .await?;

        tracing::debug!(
            audio_file_id = %audio.id,
            project_id = %audio.project_id,
            is_enhanced = audio.is_enhanced,
            "Created audio file"
        );

        Ok(audio)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> SchemaResult<Option<Self>> {
        let audio = sqlx::query_as::<_, AudioFile>(
            r#"
            SELECT id, project_id, script_id, original_file_id, file_name, file_path,
                   file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                   speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                   created_at, updated_at
            FROM audio_files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(audio)
    }

    /// Lists a project's audio files, newest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> SchemaResult<Vec<Self>> {
        let files = sqlx::query_as::<_, AudioFile>(
            r#"
            SELECT id, project_id, script_id, original_file_id, file_name, file_path,
                   file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                   speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                   created_at, updated_at
            FROM audio_files
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(files)
    }

    /// Lists files derived directly from `original_file_id`, oldest first
    pub async fn list_enhanced_versions(
        pool: &PgPool,
        original_file_id: Uuid,
    ) -> SchemaResult<Vec<Self>> {
        let files = sqlx::query_as::<_, AudioFile>(
            r#"
            SELECT id, project_id, script_id, original_file_id, file_name, file_path,
                   file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                   speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                   created_at, updated_at
            FROM audio_files
            WHERE original_file_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(original_file_id)
        .fetch_all(pool)
        .await?;

        Ok(files)
    }

    /// Applies a partial update
    ///
    /// # Errors
    ///
    /// - `SchemaError::Validation` with rule `self_reference` if the file is
    ///   named as its own original, or `cycle` if the new original is derived
    ///   from this file
    /// - `SchemaError::InvalidTransition` for an illegal status change
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAudioFile,
    ) -> SchemaResult<Option<Self>> {
        let data = validated(data)?;
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, AudioFile>(
            r#"
            SELECT id, project_id, script_id, original_file_id, file_name, file_path,
                   file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                   speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                   created_at, updated_at
            FROM audio_files
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut audio) = current else {
            return Ok(None);
        };
        if data.is_empty() {
            tx.commit().await?;
            return Ok(Some(audio));
        }

        let previous_status = audio.status;
        data.apply_to(&mut audio)?;

        if let Some(Some(original)) = data.original_file_id {
            let ancestry = lock_ancestry(&mut tx, original).await?;
            if ancestry.contains(&id) {
                return Err(SchemaError::violation(
                    "original_file_id",
                    "cycle",
                    "An audio file cannot be derived from one of its own enhanced versions",
                ));
            }
        }

        let audio = sqlx::query_as::<_, AudioFile>(
            r#"
            UPDATE audio_files
            SET script_id = $2, original_file_id = $3, file_name = $4, file_path = $5,
                file_size_bytes = $6, duration_seconds = $7, format = $8, voice_type = $9,
                voice_settings = $10, speed = $11, pitch = $12, is_enhanced = $13,
                enhancement_settings = $14, status = $15, error_message = $16,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, script_id, original_file_id, file_name, file_path,
                      file_size_bytes, duration_seconds, format, voice_type, voice_settings,
                      speed, pitch, is_enhanced, enhancement_settings, status, error_message,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(audio.script_id)
        .bind(audio.original_file_id)
        .bind(&audio.file_name)
        .bind(&audio.file_path)
        .bind(audio.file_size_bytes)
        .bind(audio.duration_seconds)
        .bind(&audio.format)
        .bind(audio.voice_type)
        .bind(Json(&audio.voice_settings))
        .bind(audio.speed)
        .bind(audio.pitch)
        .bind(audio.is_enhanced)
        .bind(Json(&audio.enhancement_settings))
        .bind(audio.status)
        .bind(&audio.error_message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if previous_status != audio.status {
            if audio.status == AudioStatus::Failed {
                tracing::warn!(
                    audio_file_id = %id,
                    error = audio.error_message.as_deref().unwrap_or(""),
                    "Audio file failed"
                );
            } else {
                tracing::debug!(
                    audio_file_id = %id,
                    from = previous_status.as_str(),
                    to = audio.status.as_str(),
                    "Audio file status changed"
                );
            }
        }

        Ok(Some(audio))
    }

    /// Deletes an audio file; enhanced versions of it lose their original reference
    pub async fn delete(pool: &PgPool, id: Uuid) -> SchemaResult<bool> {
        let result = sqlx::query("DELETE FROM audio_files WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Locks `start` and every file it was derived from, returning their ids
///
/// A concurrent relink that would close a loop through this chain has to
/// update one of these rows, so it waits for this transaction and then sees
/// the new link when it walks its own chain. The walk repeats until every row
/// on the chain is held.
async fn lock_ancestry(conn: &mut PgConnection, start: Uuid) -> SchemaResult<Vec<Uuid>> {
    let mut locked: Vec<Uuid> = Vec::new();

    loop {
        let chain: Vec<Uuid> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestors (id, original_file_id) AS (
                SELECT id, original_file_id FROM audio_files WHERE id = $1
                UNION
                SELECT a.id, a.original_file_id
                FROM audio_files a
                JOIN ancestors ON a.id = ancestors.original_file_id
            )
            SELECT id FROM ancestors
            "#,
        )
        .bind(start)
        .fetch_all(&mut *conn)
        .await?;

        if chain.iter().all(|ancestor| locked.contains(ancestor)) {
            return Ok(chain);
        }

        let newly_locked: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM audio_files WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&chain)
        .fetch_all(&mut *conn)
        .await
        .map_err(relink_error)?;

        locked.extend(newly_locked);
    }
}

/// Two relinks waiting on each other's rows are aborted by Postgres as a
/// deadlock; the loser gets a conflict on the link it tried to set
fn relink_error(err: sqlx::Error) -> SchemaError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("40P01") => {
            SchemaError::Conflict {
                field: "original_file_id".to_string(),
            }
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_map::FieldValue;
    use crate::validation::from_json;
    use serde_json::json;
    use std::str::FromStr;

    fn sample_audio() -> AudioFile {
        AudioFile {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            script_id: None,
            original_file_id: None,
            file_name: "episode-1.mp3".to_string(),
            file_path: "audio/episode-1.mp3".to_string(),
            file_size_bytes: Some(1_048_576),
            duration_seconds: Some(Decimal::from_str("612.40").unwrap()),
            format: "mp3".to_string(),
            voice_type: VoiceType::FemaleCasual,
            voice_settings: FieldMap::new(),
            speed: Decimal::new(100, 2),
            pitch: Decimal::new(100, 2),
            is_enhanced: false,
            enhancement_settings: FieldMap::new(),
            status: AudioStatus::Processing,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_audio_defaults() {
        let data: CreateAudioFile = from_json(json!({
            "project_id": Uuid::new_v4(),
            "file_name": "intro.mp3",
            "file_path": "audio/intro.mp3"
        }))
        .unwrap();

        assert_eq!(data.format, "mp3");
        assert_eq!(data.speed.to_string(), "1.00");
        assert_eq!(data.pitch.to_string(), "1.00");
        assert_eq!(data.status, AudioStatus::Pending);
        assert_eq!(data.voice_type, VoiceType::MaleProfessional);
        assert!(!data.is_enhanced);
    }

    #[test]
    fn test_speed_and_pitch_bounds() {
        let mut data = CreateAudioFile::new(Uuid::new_v4(), "a.mp3", "a.mp3");
        data.speed = Decimal::from_str("2.00").unwrap();
        data.pitch = Decimal::from_str("0.50").unwrap();
        assert!(data.validate().is_ok());

        data.speed = Decimal::from_str("2.01").unwrap();
        data.pitch = Decimal::from_str("0.49").unwrap();
        let err = validated(data).unwrap_err();
        let fields: Vec<_> = err.violations().unwrap().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["pitch", "speed"]);
    }

    #[test]
    fn test_negative_size_rejected() {
        let err = from_json::<UpdateAudioFile>(json!({ "file_size_bytes": -1 })).unwrap_err();
        assert_eq!(err.violations().unwrap()[0].field, "file_size_bytes");
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut audio = sample_audio();
        let before = audio.clone();
        let patch = UpdateAudioFile {
            original_file_id: Some(Some(audio.id)),
            file_name: Some("renamed.mp3".to_string()),
            ..Default::default()
        };

        let err = patch.apply_to(&mut audio).unwrap_err();
        let violation = &err.violations().unwrap()[0];
        assert_eq!(violation.field, "original_file_id");
        assert_eq!(violation.rule, "self_reference");
        assert_eq!(audio, before);
    }

    #[test]
    fn test_mark_as_enhanced_copy() {
        let mut audio = sample_audio();
        let original = Uuid::new_v4();
        let patch: UpdateAudioFile = from_json(json!({
            "original_file_id": original,
            "is_enhanced": true,
            "enhancement_settings": { "noise_reduction": true, "eq": "warm" }
        }))
        .unwrap();

        patch.apply_to(&mut audio).unwrap();
        assert_eq!(audio.original_file_id, Some(original));
        assert!(audio.is_enhanced);
        assert_eq!(audio.enhancement_settings["eq"].as_str(), Some("warm"));
    }

    #[test]
    fn test_audio_transitions() {
        use AudioStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_entity_transport_round_trip() {
        let mut audio = sample_audio();
        audio.enhancement_settings.insert("gain_db".to_string(), FieldValue::from(3));
        audio.speed = Decimal::from_str("1.25").unwrap();

        let text = serde_json::to_string(&audio).unwrap();
        let back: AudioFile = serde_json::from_str(&text).unwrap();

        assert_eq!(back, audio);
        assert_eq!(back.duration_seconds.unwrap().to_string(), "612.40");
    }

    #[test]
    fn test_failure_records_message() {
        let mut audio = sample_audio();
        let patch: UpdateAudioFile = from_json(json!({
            "status": "failed",
            "error_message": "voice backend timed out"
        }))
        .unwrap();

        patch.apply_to(&mut audio).unwrap();
        assert_eq!(audio.status, AudioStatus::Failed);
        assert_eq!(audio.error_message.as_deref(), Some("voice backend timed out"));
        assert_eq!(audio.duration_seconds.unwrap().to_string(), "612.40");
    }
}
