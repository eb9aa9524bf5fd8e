//! # Castwright Admin
//!
//! Applies and inspects the Castwright schema.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/castwright cargo run -p castwright-admin -- status
//! ```

use castwright_admin::command::{Cli, Command};
use clap::Parser;
use castwright_admin::config::Config;
use castwright_shared::db::{migrations, pool};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "castwright_admin=info,castwright_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = Cli::parse().into_command();
    let config = Config::from_env()?;

    tracing::info!(
        version = castwright_shared::VERSION,
        %command,
        database = %config.database.redacted_url(),
        "Castwright admin starting"
    );

    if command == Command::CreateDb {
        let created = migrations::ensure_database_exists(&config.database.url).await?;
        tracing::info!(created, "Database present");
    }

    let pool = pool::create_pool(config.database.pool_config()).await?;

    let result = match command {
        Command::Migrate | Command::CreateDb => migrate(&pool).await,
        Command::Status => print_status(&pool).await,
        Command::Revert => revert(&pool).await,
    };

    pool::close_pool(pool).await;
    result
}

async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    migrations::run_migrations(pool).await?;
    print_status(pool).await
}

async fn revert(pool: &PgPool) -> anyhow::Result<()> {
    match migrations::revert_last_migration(pool).await? {
        Some(version) => tracing::info!(version, "Reverted migration"),
        None => tracing::info!("Nothing to revert"),
    }
    print_status(pool).await
}

async fn print_status(pool: &PgPool) -> anyhow::Result<()> {
    let server_version = pool::server_version(pool).await?;
    let status = migrations::get_migration_status(pool).await?;

    println!("PostgreSQL {}", server_version);
    println!(
        "Applied migrations: {} (latest: {})",
        status.applied.len(),
        status
            .latest_version()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    if status.is_up_to_date() {
        println!("Schema is up to date");
    } else {
        println!("Pending migrations:");
        for migration in &status.pending {
            println!("  {} {}", migration.version, migration.description);
        }
    }

    Ok(())
}
