use fx_rates_backend::{
    AppState,
    config::AppConfig,
    handlers,
    jobs::exchange_rate_sync::start_exchange_rate_sync_job,
    services::{
        currency_directory::CurrencyDirectory, quote_provider::HttpQuoteProvider,
        sync_engine::SyncEngine,
    },
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_rates_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let provider = HttpQuoteProvider::new(&config.provider).expect("Failed to build quote provider client");
    let directory = CurrencyDirectory::new(db.clone());
    let engine = SyncEngine::new(db.clone(), directory.clone(), Arc::new(provider), &config.sync);

    tracing::info!(
        "Sync matrix: {} pairs from {} (concurrency {})",
        engine.pairs().len(),
        engine.source_tag(),
        config.sync.concurrency
    );

    start_exchange_rate_sync_job(db.clone(), engine.clone(), config.scheduler.clone());

    let state = AppState {
        db,
        directory,
        sync: engine,
        sync_interval_secs: i32::try_from(config.scheduler.interval.as_secs()).unwrap_or(i32::MAX),
    };

    // Build router
    let app = handlers::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(
        "Server listening on {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.bind_addr.clone())
    );

    axum::serve(listener, app).await.expect("Server error");
}
