//! Database migration management commands.

use clap::{Args, Subcommand};

use attach_core::config::{AppConfig, DatabaseBackend};
use attach_core::error::AppError;
use attach_database::DatabasePool;
use attach_database::migration::run_migrations;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    if config.database.backend != DatabaseBackend::Postgres {
        return Err(AppError::configuration(
            "Migrations require the postgres database backend",
        ));
    }

    let pool = DatabasePool::connect_only(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            let latest = run_migrations(pool.pool()).await?;
            match latest {
                Some(version) => output::print_success(&format!(
                    "All migrations applied (latest version {version})."
                )),
                None => output::print_warning("No migrations are embedded in this build."),
            }
        }
    }

    pool.close().await;
    Ok(())
}
