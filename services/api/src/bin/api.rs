//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        OpenAiInsightsAdapter, OpenAiProgressionAdapter, PgDocumentStore, UnconfiguredFlows,
    },
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    Router,
};
use life_engine_core::ports::{
    AdaptiveProgressionService, CrossDomainInsightsService, DocumentStore,
};
use life_engine_core::MemoryStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Document Store ---
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let pg_store = PgDocumentStore::new(db_pool);
            info!("Running database migrations...");
            pg_store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(pg_store)
        }
        None => {
            warn!("DATABASE_URL is not set; records are kept in memory only.");
            Arc::new(MemoryStore::new())
        }
    };

    // --- 3. Initialize the Generative Flow Adapters ---
    let (progression, insights): (
        Arc<dyn AdaptiveProgressionService>,
        Arc<dyn CrossDomainInsightsService>,
    ) = match config.openai_key() {
        Ok(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            (
                Arc::new(OpenAiProgressionAdapter::new(
                    openai_client.clone(),
                    config.progression_model.clone(),
                )),
                Arc::new(OpenAiInsightsAdapter::new(
                    openai_client,
                    config.insights_model.clone(),
                )),
            )
        }
        Err(e) => {
            warn!("{}; the progression and insights routes will fail.", e);
            (Arc::new(UnconfiguredFlows), Arc::new(UnconfiguredFlows))
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        config: config.clone(),
        progression,
        insights,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-user-id")]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
