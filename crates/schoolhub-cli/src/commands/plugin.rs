//! Tenant plugin installation commands.

use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::output::{self, InstallationRow, OutputFormat};
use schoolhub_core::error::AppError;
use schoolhub_entity::plugin::InstalledPlugin;
use schoolhub_service::RequestContext;

/// Arguments for the plugin command
#[derive(Debug, Args)]
pub struct PluginArgs {
    /// Tenant the command runs in
    #[arg(short, long)]
    pub tenant: String,

    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// List the tenant's installations
    List,
    /// List only enabled installations
    Enabled,
    /// Install a catalog plugin
    Install {
        /// Plugin business key
        plugin_id: String,
    },
    /// Enable an installed plugin
    Enable {
        /// Plugin business key
        plugin_id: String,
    },
    /// Disable an installed plugin
    Disable {
        /// Plugin business key
        plugin_id: String,
    },
    /// Remove an installation
    Uninstall {
        /// Plugin business key
        plugin_id: String,
    },
    /// Show effective settings, or change them with --set
    Settings {
        /// Plugin business key
        plugin_id: String,
        /// Setting to change as key=value; the value is parsed as JSON
        /// and falls back to a plain string. A `null` value removes the key.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    /// Move an installation to the catalog's current version
    Upgrade {
        /// Plugin business key
        plugin_id: String,
    },
    /// List installations behind the catalog version
    Outdated,
}

/// Execute plugin commands
pub async fn execute(args: &PluginArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let ctx = RequestContext::new(args.tenant.as_str());

    super::with_platform(env, |platform| async move {
        let installs = &platform.installations;

        match &args.command {
            PluginCommand::List => print_installations(&installs.list(&ctx).await?, format),
            PluginCommand::Enabled => print_installations(&installs.enabled(&ctx).await?, format),
            PluginCommand::Install { plugin_id } => {
                let record = installs.install(&ctx, plugin_id).await?;
                output::print_success(&format!(
                    "Installed '{}' {} for tenant '{}'",
                    record.plugin_id, record.version, ctx.tenant_id
                ));
            }
            PluginCommand::Enable { plugin_id } => {
                installs.enable(&ctx, plugin_id).await?;
                output::print_success(&format!("Enabled '{}'", plugin_id));
            }
            PluginCommand::Disable { plugin_id } => {
                installs.disable(&ctx, plugin_id).await?;
                output::print_success(&format!("Disabled '{}'", plugin_id));
            }
            PluginCommand::Uninstall { plugin_id } => {
                installs.uninstall(&ctx, plugin_id).await?;
                output::print_success(&format!("Uninstalled '{}'", plugin_id));
            }
            PluginCommand::Settings { plugin_id, set } => {
                if !set.is_empty() {
                    installs
                        .update_settings(&ctx, plugin_id, parse_settings(set)?)
                        .await?;
                    output::print_success(&format!("Updated settings for '{}'", plugin_id));
                }
                let settings = installs.effective_settings(&ctx, plugin_id).await?;
                output::print_item(&settings, format);
            }
            PluginCommand::Upgrade { plugin_id } => {
                let record = installs.upgrade(&ctx, plugin_id).await?;
                output::print_success(&format!(
                    "'{}' is at version {}",
                    record.plugin_id, record.version
                ));
            }
            PluginCommand::Outdated => {
                let outdated = installs.outdated(&ctx).await?;
                if outdated.is_empty() {
                    println!("All installed plugins are up to date.");
                }
                for entry in &outdated {
                    output::print_kv(
                        &entry.installation.plugin_id,
                        &format!("{} -> {}", entry.installation.version, entry.catalog_version),
                    );
                }
            }
        }

        Ok(())
    })
    .await
}

fn print_installations(records: &[InstalledPlugin], format: OutputFormat) {
    let rows: Vec<InstallationRow> = records.iter().map(InstallationRow::from).collect();
    output::print_list(&rows, format);
}

/// Parse `key=value` pairs into a settings patch.
fn parse_settings(pairs: &[String]) -> Result<Map<String, Value>, AppError> {
    let mut patch = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| AppError::validation(format!("Expected KEY=VALUE, got '{pair}'")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::validation(format!("Empty setting key in '{pair}'")));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(key.to_string(), value);
    }
    Ok(patch)
}
