//! Pagestore connectivity check
//!
//! Loads configuration, initializes logging, and verifies the configured
//! PostgreSQL database is reachable.

use tracing_subscriber::{EnvFilter, fmt};

use pagestore_core::config::AppConfig;
use pagestore_core::error::AppError;
use pagestore_database::DatabasePool;

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
        tracing::error!("Pagestore error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `PAGESTORE_ENV`
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PAGESTORE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Pagestore v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        default_limit = config.listing.default_limit,
        max_limit = config.listing.max_limit,
        "Listing defaults"
    );

    let pool = DatabasePool::connect(&config.database).await?;
    let healthy = pool.health_check().await?;
    tracing::info!(healthy, "Database health check");
    pool.close().await;

    if healthy {
        Ok(())
    } else {
        Err(AppError::database("Database health check returned an unexpected value"))
    }
}
