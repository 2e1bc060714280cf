//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use schoolhub_entity::plugin::{InstalledPlugin, Plugin};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Catalog plugin table row
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    /// Business key
    #[tabled(rename = "Plugin")]
    pub plugin_id: String,
    /// Display name
    #[tabled(rename = "Name")]
    pub name: String,
    /// Latest version
    #[tabled(rename = "Version")]
    pub version: String,
    /// Category
    #[tabled(rename = "Category")]
    pub category: String,
    /// Catalog status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Average rating and count
    #[tabled(rename = "Rating")]
    pub rating: String,
    /// Install count
    #[tabled(rename = "Downloads")]
    pub downloads: u64,
}

impl From<&Plugin> for PluginRow {
    fn from(plugin: &Plugin) -> Self {
        Self {
            plugin_id: plugin.plugin_id.clone(),
            name: plugin.name.clone(),
            version: plugin.version.clone(),
            category: plugin.category.clone(),
            status: plugin.status.to_string(),
            rating: format!("{:.1} ({})", plugin.rating, plugin.rating_count),
            downloads: plugin.downloads,
        }
    }
}

/// Installation table row
#[derive(Debug, Serialize, Tabled)]
pub struct InstallationRow {
    /// Business key
    #[tabled(rename = "Plugin")]
    pub plugin_id: String,
    /// Installed version
    #[tabled(rename = "Version")]
    pub version: String,
    /// Lifecycle status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Install time
    #[tabled(rename = "Installed")]
    pub installed_at: String,
    /// Last runtime error
    #[tabled(rename = "Last Error")]
    pub last_error: String,
}

impl From<&InstalledPlugin> for InstallationRow {
    fn from(record: &InstalledPlugin) -> Self {
        Self {
            plugin_id: record.plugin_id.clone(),
            version: record.version.clone(),
            status: record.status.to_string(),
            installed_at: record.installed_at.format("%Y-%m-%d %H:%M").to_string(),
            last_error: record.last_error.clone().unwrap_or_default(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
