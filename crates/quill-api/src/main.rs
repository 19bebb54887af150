//! Quill API server entry point.

use std::sync::Arc;

use quill_api::config::AppConfig;
use quill_api::error::AppError;
use quill_api::state::AppState;
use quill_api::telemetry;
use quill_core::clock::SystemClock;
use quill_ollama::OllamaGenerator;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Quill API server");

    let generator = OllamaGenerator::new(config.ollama.clone())
        .map_err(|e| AppError::Config(format!("failed to build Ollama client: {e}")))?;
    tracing::info!(
        url = %config.ollama.url,
        model = %config.ollama.model,
        "using Ollama backend"
    );

    let app_state = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("database migrations applied");

            AppState::postgres(
                pool,
                Arc::new(SystemClock),
                Arc::new(generator),
                config.delete_policy,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
            AppState::in_memory(
                Arc::new(SystemClock),
                Arc::new(generator),
                config.delete_policy,
            )
        }
    };

    let app = quill_api::app(app_state);

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
