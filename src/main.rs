mod app_state;
mod config;
mod models;
mod routes;
mod services;

use axum::response::Html;
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::extractor::TicketExtractor;
use services::model::ConverseHttpClient;
use services::store;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing sutham server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_histogram!(
        "extraction_duration_seconds",
        "Wall-clock time of one model extraction call"
    );
    metrics::describe_counter!("extractions_total", "Total tickets extracted");
    metrics::describe_counter!("extractions_failed", "Total extraction calls that failed");

    // Initialize ticket store
    tracing::info!("Opening SQLite ticket store");
    let db_pool = store::init_pool(&config.database_url)
        .await
        .expect("Failed to open ticket store");
    store::init_schema(&db_pool)
        .await
        .expect("Failed to initialize ticket schema");

    // Initialize model endpoint client
    tracing::info!(model_id = %config.model_id, "Initializing model endpoint client");
    let model = ConverseHttpClient::new(
        &config.model_endpoint,
        &config.model_api_token,
        &config.model_id,
        Duration::from_secs(config.model_timeout_secs),
    )
    .expect("Failed to initialize model client");

    let extractor = TicketExtractor::new(Arc::new(model));

    // Create shared application state
    let state = AppState::new(db_pool, extractor, &config.artifact_dir, &config.image_dir);

    // Build API routes
    let app = Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../static/index.html")) }))
        // API endpoints
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/detect", post(routes::detect::detect))
        .route("/api/v1/tickets", get(routes::detect::list_tickets))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)); // 10 MB limit

    tracing::info!("Starting sutham on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
