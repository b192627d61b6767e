use jobboard_api::{
    AppState, GeneratorState,
    assistant::{OpenAiDescriptionGenerator, TemplateDescriptionGenerator},
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{LocalDiskStorage, S3StorageClient, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects and migrates the database, selects the
/// storage backend and description generator, then serves the API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging: RUST_LOG wins, otherwise a verbose default for local work
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jobboard_api=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Storage: local disk for development, S3-compatible bucket in production
    let storage: StorageState = match config.env {
        Env::Local => Arc::new(LocalDiskStorage::new(config.upload_dir.clone())),
        Env::Production => Arc::new(S3StorageClient::new(
            &config.s3_endpoint,
            &config.s3_region,
            &config.s3_key,
            &config.s3_secret,
            &config.s3_bucket,
        )),
    };
    storage.ensure_ready().await?;

    // 5. Description generator
    let ai: GeneratorState = match &config.openai_api_key {
        Some(key) => {
            tracing::info!("AI descriptions served by the OpenAI API");
            Arc::new(OpenAiDescriptionGenerator::new(key.clone()))
        }
        None => Arc::new(TemplateDescriptionGenerator),
    };

    // 6. State and server
    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState {
        repo,
        storage,
        ai,
        config,
    });

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
