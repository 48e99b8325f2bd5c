//! Analytica API Server
//!
//! Run with: cargo run --bin analytica
//!
//! Configuration is read from the first of
//! `~/.config/analytica/config.toml`, `/etc/analytica/config.toml` and
//! `./config.toml`, then `ANALYTICA_*` environment variables override it.
//! `RUST_LOG` takes precedence over the configured log level.

use analytica::api::{serve, ApiConfig, AppState};
use analytica::config::{Config, LoggingConfig};
use analytica::query::QueryCompiler;
use analytica::service::AnalyticsService;
use analytica::store::{SqlExecutor, SqliteExecutor};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_logging(&config.logging);

    tracing::info!("Starting Analytica API server v{}", env!("CARGO_PKG_VERSION"));

    // Open the database
    let db_path = config.database.resolved_path();
    tracing::info!("Database: {:?}", db_path);
    let sqlite = SqliteExecutor::open(&db_path)?;

    if let Some(script) = config.database.resolved_init_script() {
        sqlite.execute_script(&script).await?;
    }

    let executor: Arc<dyn SqlExecutor> = Arc::new(sqlite);
    executor.ping().await?;

    let compiler = QueryCompiler::new(config.compiler.default_time_column.clone());
    tracing::info!(
        "Default time column: {}",
        compiler.default_time_column()
    );

    let service = AnalyticsService::new(compiler, Arc::clone(&executor));
    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(service, executor, api_config.clone());

    // Run server
    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Analytica API server stopped");
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("analytica={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
