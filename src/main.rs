use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardparty::{
    api, broadcast,
    catalog::InMemoryCatalog,
    config::AppConfig,
    state::AppState,
    store::{GameStore, JsonFileStore, MemoryStore},
    telemetry::TracingTelemetry,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardparty=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cardparty...");

    let config = AppConfig::from_env();
    tracing::info!(?config, "Configuration loaded");

    let catalog = match InMemoryCatalog::load_path(&config.decks_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load decks: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn GameStore> = match &config.data_dir {
        Some(dir) => match JsonFileStore::open(dir).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Failed to open data directory: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("CARDPARTY_DATA_DIR not set, games are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = config.bind_addr;
    let sweep = config.deadline_sweep;
    let state = Arc::new(AppState::new(
        config,
        store,
        Arc::new(catalog),
        Arc::new(TracingTelemetry),
    ));

    // Spawn background task for advancing rounds whose deadline passed
    if let Some(interval) = sweep {
        broadcast::spawn_deadline_sweeper(state.clone(), interval);
    }

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
