//! Gym Supervisor - real-time exercise repetition tracking
//!
//! A Rust backend that turns streamed pose landmarks into rep and set
//! counts and records completed sets in the user's daily workout log.

mod api;
mod config;
mod db;
mod exercise;
mod geometry;
mod pose;
mod protocol;
mod runtime;
mod state_machine;
mod sync;

use api::{create_router, AppState};
use config::ServerConfig;
use db::Database;
use exercise::ExerciseRegistry;
use runtime::DatabaseStorage;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gym_supervisor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let registry = ExerciseRegistry::builtin();
    tracing::info!(
        exercises = registry.entries().len(),
        reps_per_set = config.rep_targets.default_reps(),
        "Exercise registry initialized"
    );

    // Create application state
    let state = AppState::new(DatabaseStorage::new(db), registry, config.rep_targets);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Gym supervisor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
