//! SchoolHub server
//!
//! Assembles the plugin marketplace, tenant installations and the domain
//! event bus, then runs until a shutdown signal arrives.

use tracing_subscriber::{EnvFilter, fmt};

use schoolhub_core::config::{AppConfig, LogFormat};
use schoolhub_core::error::AppError;
use schoolhub_service::Platform;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `SCHOOLHUB_ENV`
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SCHOOLHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SchoolHub v{}", env!("CARGO_PKG_VERSION"));

    let platform = Platform::build(config).await?;

    if !platform.repositories.health_check().await? {
        return Err(AppError::internal("Document store failed its health check"));
    }

    tracing::info!(
        handled_event_types = ?platform.bus.registry().event_types(),
        "SchoolHub is ready"
    );

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, draining event handlers...");

    let drained = platform.shutdown().await;
    let stats = platform.bus.stats();
    tracing::info!(
        drained,
        published = stats.published,
        succeeded = stats.succeeded,
        failed = stats.failed,
        timed_out = stats.timed_out,
        panicked = stats.panicked,
        "SchoolHub shut down"
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
