//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use schoolhub_core::config::DatabaseProvider;
use schoolhub_core::error::AppError;
use schoolhub_database::DatabasePool;

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
pub async fn execute(args: &MigrateArgs, env: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;

    match &args.command {
        MigrateCommand::Run => {
            if config.database.provider != DatabaseProvider::Postgres {
                output::print_warning("The in-memory store has no migrations to run.");
                return Ok(());
            }
            let pool = DatabasePool::connect(&config.database).await?;
            println!("Running database migrations...");
            schoolhub_database::migration::run_migrations(pool.pool()).await?;
            pool.close().await;
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(())
}
