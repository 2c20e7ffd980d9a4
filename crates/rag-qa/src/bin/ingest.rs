//! Ingestion trigger binary
//!
//! Reads one trigger event (S3 notification or direct invocation) as JSON
//! from the file named by the first argument, or from stdin, runs the
//! ingestion and prints `{"statusCode", "body"}`. Exits non-zero when the
//! status is not 200.
//!
//! Run with: cargo run -p rag-qa --bin rag-qa-ingest event.json

use std::io::Read;
use std::sync::Arc;

use rag_qa::{
    config::{RagConfig, Settings},
    pipeline::Pipeline,
    providers::S3DocumentStore,
    trigger::{IngestTrigger, TriggerDefaults},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_qa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw)?;

    let config_path = std::env::var("RAG_QA_CONFIG").ok().map(std::path::PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;
    let settings = Settings::from_config(&config).await?;

    let pipeline = Arc::new(Pipeline::from_config(&config, &settings)?);
    let store = Arc::new(S3DocumentStore::for_region(&settings.region).await);
    let defaults = TriggerDefaults {
        bucket: settings.bucket_name.clone(),
        collection: settings.collection_name.clone(),
        region: settings.region.clone(),
        embedding: config.embedding_request()?,
        chunk_size: config.chunking.chunk_size,
        overlap: config.chunking.chunk_overlap,
    };

    let trigger = IngestTrigger::new(pipeline, store, defaults);
    let response = trigger.handle(event).await;

    println!("{}", serde_json::to_string(&response)?);
    if response.status_code != 200 {
        std::process::exit(1);
    }
    Ok(())
}
