/// Configuration for the admin tool
///
/// Loaded from environment variables, with a `.env` file in the working
/// directory picked up for development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_MIN_CONNECTIONS`: Idle connections kept open (default: 2)
/// - `DATABASE_CONNECT_TIMEOUT_SECONDS`: Wait for a connection (default: 30)
/// - `RUST_LOG`: Log filter (default: `castwright_admin=info,castwright_shared=info`)
///
/// # Example
///
/// ```no_run
/// use castwright_admin::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Using database {}", config.database.redacted_url());
/// # Ok(())
/// # }
/// ```

use castwright_shared::db::pool::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use url::Url;

/// Complete admin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL
    pub url: String,

    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl DatabaseSettings {
    /// Pool configuration for the shared database layer
    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_seconds: self.connect_timeout_seconds,
            ..Default::default()
        }
    }

    /// The URL with any password replaced, safe to log
    pub fn redacted_url(&self) -> String {
        let Ok(mut url) = Url::parse(&self.url) else {
            return "<invalid database url>".to_string();
        };
        if url.password().is_some() && url.set_password(Some("***")).is_err() {
            return "<invalid database url>".to_string();
        }
        url.to_string()
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric setting
    /// cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 2u32)?;
        let connect_timeout_seconds = parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT_SECONDS", 30u64)?;

        if min_connections > max_connections {
            anyhow::bail!(
                "DATABASE_MIN_CONNECTIONS ({}) must not exceed DATABASE_MAX_CONNECTIONS ({})",
                min_connections,
                max_connections
            );
        }

        Ok(Self {
            database: DatabaseSettings {
                url,
                max_connections,
                min_connections,
                connect_timeout_seconds,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
