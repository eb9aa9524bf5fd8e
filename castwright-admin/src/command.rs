/// Admin command line
///
/// ```text
/// castwright-admin [migrate|status|create-db|revert]
/// ```
///
/// With no subcommand the tool applies pending migrations.

use clap::{Parser, Subcommand};
use std::fmt;

#[derive(Debug, Parser)]
#[command(name = "castwright-admin")]
#[command(about = "Applies and inspects the Castwright database schema")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// The requested subcommand, `migrate` when none was given
    pub fn into_command(self) -> Command {
        self.command.unwrap_or_default()
    }
}

/// What the admin tool was asked to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Apply every pending migration
    #[default]
    Migrate,

    /// Print applied and pending migrations
    Status,

    /// Create the configured database if it is missing, then migrate
    CreateDb,

    /// Revert the most recently applied migration
    Revert,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Migrate => "migrate",
            Command::Status => "status",
            Command::CreateDb => "create-db",
            Command::Revert => "revert",
        };
        f.write_str(name)
    }
}
