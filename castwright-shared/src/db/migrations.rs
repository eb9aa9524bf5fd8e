/// Schema migrations
///
/// The SQL files live in `migrations/` at the workspace root and are embedded
/// into the binary at compile time. Each migration is reversible:
/// - `{version}_{name}.up.sql` creates
/// - `{version}_{name}.down.sql` drops
///
/// # Example
///
/// ```no_run
/// use castwright_shared::db::pool::{create_pool, DatabaseConfig};
/// use castwright_shared::db::migrations::{run_migrations, get_migration_status};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///
///     run_migrations(&pool).await?;
///
///     let status = get_migration_status(&pool).await?;
///     assert!(status.is_up_to_date());
///     Ok(())
/// }
/// ```

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::postgres::PgPool;
use sqlx::Postgres;
use tracing::{debug, info, warn};

/// Migrations embedded from the workspace `migrations/` directory
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// A migration known to this build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
}

/// Applied vs. embedded migrations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Versions recorded as successfully applied, ascending
    pub applied: Vec<i64>,

    /// Embedded migrations not yet applied, ascending
    pub pending: Vec<MigrationInfo>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn latest_version(&self) -> Option<i64> {
        self.applied.last().copied()
    }
}

/// Embedded up-migrations, ascending by version
pub fn embedded_migrations() -> Vec<MigrationInfo> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| MigrationInfo {
            version: m.version,
            description: m.description.to_string(),
        })
        .collect()
}

/// Applies every pending migration
///
/// Each migration runs in its own transaction; a failure stops the run and
/// leaves earlier migrations applied.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(embedded = embedded_migrations().len(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reverts the most recently applied migration
///
/// # Returns
///
/// The reverted version, None if nothing was applied
pub async fn revert_last_migration(pool: &PgPool) -> Result<Option<i64>, MigrateError> {
    let status = get_migration_status(pool).await?;

    let Some(latest) = status.latest_version() else {
        info!("No applied migrations to revert");
        return Ok(None);
    };
    let target = status
        .applied
        .iter()
        .rev()
        .nth(1)
        .copied()
        .unwrap_or(0);

    warn!(version = latest, target, "Reverting migration");
    MIGRATOR.undo(pool, target).await?;

    Ok(Some(latest))
}

/// Compares the migrations recorded in the database with the embedded ones
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    debug!("Checking migration status");

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if table_exists {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        debug!("Migrations table does not exist yet");
        Vec::new()
    };

    let pending = embedded_migrations()
        .into_iter()
        .filter(|m| !applied.contains(&m.version))
        .collect::<Vec<_>>();

    debug!(applied = applied.len(), pending = pending.len(), "Migration status retrieved");

    Ok(MigrationStatus { applied, pending })
}

/// Creates the database named in `database_url` if it doesn't exist
///
/// # Returns
///
/// True if the database was created, false if it was already there
pub async fn ensure_database_exists(database_url: &str) -> Result<bool, sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(false);
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await?;
    Ok(true)
}
