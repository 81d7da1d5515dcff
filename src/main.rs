//! ELIS - Explain Like I'm Stuck
//!
//! A diagnostic tutor backend: keeps debugging sessions, builds Socratic
//! prompts from them and talks to the model on the user's behalf.

mod api;
mod engine;
mod llm;
mod prompt;
mod repository;
mod session;
mod store;
mod title;

use api::{create_router, AppState};
use llm::{LlmConfig, LlmService, ModelGateway};
use repository::SessionRepository;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use store::{PersistentStore, SqliteStore};
use tower_http::{
    compression::CompressionLayer,
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
                .unwrap_or_else(|_| "elis=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("ELIS_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.elis/elis.db")
    });

    let port: u16 = std::env::var("ELIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening store");
    let store = PersistentStore::new(Arc::new(SqliteStore::open(&db_path)?));
    let repo = SessionRepository::load(store.clone());

    let gateway = Arc::new(ModelGateway::new(LlmConfig::from_env(), store));
    if gateway.has_credential() {
        tracing::info!(model = %gateway.model_id(), source = ?gateway.credential_source(), "Model gateway ready");
    } else {
        tracing::warn!("No Gemini API key configured. Set GEMINI_API_KEY or save one from the UI.");
    }

    let state = AppState::new(repo, gateway.clone(), gateway);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ELIS server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
