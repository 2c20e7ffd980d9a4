//! Question-answering HTTP server binary
//!
//! Run with: cargo run -p rag-qa --bin rag-qa-server [config.toml]
//!
//! The config path may also be given with `RAG_QA_CONFIG`.

use std::path::PathBuf;

use rag_qa::{
    config::{RagConfig, Settings},
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_qa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RAG_QA_CONFIG").ok())
        .map(PathBuf::from);

    // Load configuration
    let config = RagConfig::load(config_path.as_deref())?;
    let settings = Settings::from_config(&config).await?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embedding.model);
    tracing::info!("  - Text model: {}", config.generation.model);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Collection: {}", settings.collection_name);
    tracing::info!("  - Region: {}", settings.region);

    let state = AppState::from_config(&config, &settings)?;
    let server = RagServer::new(config.server.clone(), state);

    println!("\nServer starting...");
    println!("  Home:   http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /ask            - Ask a question");
    println!("  GET  /collectioninfo - Describe the collection");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
