/// Database plumbing for Castwright
///
/// - `pool`: PostgreSQL connection pool setup and health checks
/// - `migrations`: embedded schema migrations and their status
///
/// Entity queries live next to their types in the `models` module.
///
/// # Example
///
/// ```no_run
/// use castwright_shared::db::{migrations, pool};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = pool::create_pool(pool::DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///     migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
