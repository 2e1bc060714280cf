//! Plugin catalog commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat, PluginRow};
use schoolhub_core::error::AppError;
use schoolhub_entity::plugin::Plugin;

/// Arguments for the catalog command
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Catalog subcommand
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Catalog subcommands
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List every catalog plugin
    List,
    /// Show one plugin in full
    Show {
        /// Plugin business key
        plugin_id: String,
    },
    /// List a category, most popular first
    Category {
        /// Category name
        category: String,
    },
    /// Full-text search over the catalog
    Search {
        /// Search terms
        query: String,
    },
    /// Import plugins from a JSON array file
    Import {
        /// Path to the JSON file
        path: String,
    },
    /// Record a rating between 0 and 5
    Rate {
        /// Plugin business key
        plugin_id: String,
        /// Score
        score: f64,
    },
    /// Release a new version
    Release {
        /// Plugin business key
        plugin_id: String,
        /// New version
        version: String,
        /// Release notes
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Mark a plugin as deprecated
    Deprecate {
        /// Plugin business key
        plugin_id: String,
    },
    /// Withdraw a plugin from new installs
    Withdraw {
        /// Plugin business key
        plugin_id: String,
    },
}

/// Execute catalog commands
pub async fn execute(args: &CatalogArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    super::with_platform(env, |platform| async move {
        let marketplace = &platform.marketplace;

        match &args.command {
            CatalogCommand::List => print_plugins(&marketplace.list().await?, format),
            CatalogCommand::Show { plugin_id } => {
                let plugin = marketplace.get_by_plugin_id(plugin_id).await?;
                output::print_item(&plugin, format);
            }
            CatalogCommand::Category { category } => {
                print_plugins(&marketplace.by_category(category).await?, format)
            }
            CatalogCommand::Search { query } => {
                print_plugins(&marketplace.search(query).await?, format)
            }
            CatalogCommand::Import { path } => {
                let summary = marketplace.import_file(path).await?;
                output::print_success(&format!("Imported catalog from {}", path));
                output::print_kv("Imported", &summary.imported.to_string());
                output::print_kv("Skipped", &summary.skipped.to_string());
                output::print_kv("Rejected", &summary.rejected.to_string());
            }
            CatalogCommand::Rate { plugin_id, score } => {
                let plugin = marketplace.rate(plugin_id, *score).await?;
                output::print_success(&format!(
                    "Rated '{}': now {:.2} over {} ratings",
                    plugin.plugin_id, plugin.rating, plugin.rating_count
                ));
            }
            CatalogCommand::Release {
                plugin_id,
                version,
                notes,
            } => {
                let plugin = marketplace.release(plugin_id, version, notes).await?;
                output::print_success(&format!(
                    "Released '{}' version {}",
                    plugin.plugin_id, plugin.version
                ));
            }
            CatalogCommand::Deprecate { plugin_id } => {
                marketplace.deprecate(plugin_id).await?;
                output::print_success(&format!("Deprecated '{}'", plugin_id));
            }
            CatalogCommand::Withdraw { plugin_id } => {
                marketplace.withdraw(plugin_id).await?;
                output::print_success(&format!("Withdrew '{}'", plugin_id));
            }
        }

        Ok(())
    })
    .await
}

fn print_plugins(plugins: &[Plugin], format: OutputFormat) {
    let rows: Vec<PluginRow> = plugins.iter().map(PluginRow::from).collect();
    output::print_list(&rows, format);
}
