//! Platform status command.

use serde::Serialize;

use crate::output::{self, OutputFormat};
use schoolhub_core::error::AppError;

#[derive(Debug, Serialize)]
struct StatusReport {
    environment: String,
    provider: String,
    store_healthy: bool,
    catalog_plugins: usize,
    event_types: Vec<String>,
}

/// Execute the status command
pub async fn execute(env: &str, format: OutputFormat) -> Result<(), AppError> {
    let report = super::with_platform(env, |platform| async move {
        Ok(StatusReport {
            environment: env.to_string(),
            provider: format!("{:?}", platform.config.database.provider),
            store_healthy: platform.repositories.health_check().await?,
            catalog_plugins: platform.marketplace.list().await?.len(),
            event_types: platform.bus.registry().event_types(),
        })
    })
    .await?;

    match format {
        OutputFormat::Json => output::print_item(&report, format),
        OutputFormat::Table => {
            println!("SchoolHub status");
            output::print_kv("Environment", &report.environment);
            output::print_kv("Store provider", &report.provider);
            output::print_kv("Store healthy", &report.store_healthy.to_string());
            output::print_kv("Catalog plugins", &report.catalog_plugins.to_string());
            output::print_kv("Handled event types", &report.event_types.join(", "));
        }
    }
    Ok(())
}
