// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use assessment::clock::SystemClock;
use assessment::config::Config;
use assessment::routes;
use assessment::services::HttpExamApi;
use assessment::session::{SessionRegistry, SessionServices};
use assessment::state::AppState;
use assessment::store::{DurableStore, MemoryStore, SqliteStore};
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "assessment.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn DurableStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory session store; progress will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = SqliteStore::connect(&config.database_url).await?;
        tracing::info!("Session store ready at {}", config.database_url);
        Arc::new(store)
    };

    let exam_api = Arc::new(HttpExamApi::new(
        config.exam_api_url.clone(),
        config.exam_api_token.clone(),
    )?);
    tracing::info!("Using exam service at {}", config.exam_api_url);

    let services = SessionServices {
        source: exam_api.clone(),
        sink: exam_api,
        store,
        clock: Arc::new(SystemClock),
        default_duration_secs: config.default_duration_secs,
    };
    let sessions = Arc::new(SessionRegistry::new(
        services,
        Duration::from_millis(config.tick_interval_ms),
    ));

    let state = AppState {
        sessions,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
