//! Biblio Server - Library Circulation Backend

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{sweeper::ExpirySweeper, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblio_server={},tower_http=debug", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Biblio Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository.clone(), config.circulation.clone());

    // Start the background expiry sweeper, owned by this startup sequence
    let sweeper = config.circulation.sweeper_enabled.then(|| {
        ExpirySweeper::new(repository, config.circulation.clone()).start()
    });
    if sweeper.is_none() {
        tracing::info!("Expiry sweeper is disabled in configuration");
    }

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the sweeper deterministically after the server drains
    if let Some(handle) = sweeper {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Copy inventory
        .route("/books/:book_id/copies", get(api::copies::list_copies))
        .route("/books/:book_id/copies", post(api::copies::create_copy))
        .route("/copies/:id", get(api::copies::get_copy))
        .route("/copies/:id", delete(api::copies::delete_copy))
        .route("/copies/:id/lost", post(api::copies::mark_lost))
        .route("/copies/:id/borrow", post(api::copies::borrow_copy))
        // Loans
        .route("/loans", get(api::loans::list_loans))
        .route("/loans/stats", get(api::loans::loan_stats))
        .route("/loans/:id", get(api::loans::get_loan))
        .route("/loans/:id/confirm-pickup", post(api::loans::confirm_pickup))
        .route("/loans/:id/return", post(api::loans::return_loan))
        .route("/loans/:id/cancel", post(api::loans::cancel_loan))
        .route("/users/:user_id/loans", get(api::loans::user_loans))
        // Reservations
        .route("/reservations", post(api::reservations::create_reservation))
        .route("/reservations/:id", delete(api::reservations::cancel_reservation))
        .route("/reservations/:id/fulfill", post(api::reservations::fulfill_reservation))
        .route("/reservations/book/:book_id", get(api::reservations::book_queue))
        .route("/users/:user_id/reservations", get(api::reservations::user_reservations))
        // Cart & checkout
        .route("/cart/:user_id", get(api::cart::get_cart))
        .route("/cart/:user_id/items", post(api::cart::add_item))
        .route("/cart/:user_id/items/:book_id", delete(api::cart::remove_item))
        .route("/cart/:user_id/clear", delete(api::cart::clear_cart))
        .route("/cart/:user_id/checkout", post(api::cart::checkout))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
