//! CLI command definitions and dispatch.

pub mod catalog;
pub mod migrate;
pub mod plugin;
pub mod status;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use schoolhub_core::config::AppConfig;
use schoolhub_core::error::AppError;
use schoolhub_service::Platform;

/// SchoolHub plugin marketplace administration
#[derive(Debug, Parser)]
#[command(name = "schoolhub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (loads config/default.toml then config/<env>.toml)
    #[arg(short, long, env = "SCHOOLHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Browse and curate the plugin catalog
    Catalog(catalog::CatalogArgs),
    /// Manage a tenant's installed plugins
    Plugin(plugin::PluginArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Show store health and registered event handlers
    Status,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Catalog(args) => catalog::execute(args, &self.env, self.format).await,
            Commands::Plugin(args) => plugin::execute(args, &self.env, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &self.env).await,
            Commands::Status => status::execute(&self.env, self.format).await,
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: assemble the platform, run a command against it, then drain
/// the event bus so listeners finish before the process exits.
pub async fn with_platform<T, F, Fut>(env: &str, run: F) -> Result<T, AppError>
where
    F: FnOnce(Platform) -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let platform = Platform::build(load_config(env)?).await?;
    let result = run(platform.clone()).await;
    if !platform.shutdown().await {
        crate::output::print_warning("Some event handlers did not finish before exit.");
    }
    result
}
