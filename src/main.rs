//! Game Library Backend
//!
//! REST backend for a personal game catalog with SQLite persistence, tag and
//! text filtering, weighted review scores and cover image storage.

mod api;
mod config;
mod db;
mod errors;
mod media;
mod models;
mod scan;
mod scoring;
mod search;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use media::{MediaStore, MEDIA_ROUTE};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub media: Arc<MediaStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Starting Game Library Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Media directory: {:?}", config.media_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.cors_origin.is_none() {
        tracing::warn!("No CORS origin configured (CATALOG_CORS_ORIGIN). Any origin is allowed");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let media = Arc::new(MediaStore::new(config.media_dir.clone()));
    media.ensure_dir().await?;

    let games = repo.list_games().await?;
    tracing::info!("Catalog loaded with {} games", games.len());

    // Create application state
    let state = AppState {
        repo,
        media,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let cover_limit = DefaultBodyLimit::max(state.config.max_cover_bytes);
    let media_dir = ServeDir::new(state.media.dir());

    let api_routes = Router::new()
        // Games
        .route("/games", get(api::list_games).post(api::create_game))
        .route("/games/random", get(api::random_game))
        .route(
            "/games/{id}",
            get(api::get_game)
                .put(api::update_game)
                .delete(api::delete_game),
        )
        .route(
            "/games/{id}/cover",
            post(api::upload_cover).layer(cover_limit),
        )
        // Collections
        .route(
            "/collections",
            get(api::list_collections).post(api::create_collection),
        )
        .route("/collections/{id}/games", get(api::list_collection_games))
        // Tags
        .route("/tags", get(api::list_tags))
        // Search
        .route("/search", get(api::search_games))
        // Library scan
        .route("/scan", post(api::scan_library_folder))
        .route("/revision", get(api::get_revision));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .nest_service(MEDIA_ROUTE, media_dir)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            tracing::warn!("Invalid CORS origin ({}), allowing any origin", e);
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
