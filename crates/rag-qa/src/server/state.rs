//! Application state for the question-answering server

use std::sync::Arc;

use crate::config::{RagConfig, Settings};
use crate::error::Result;
use crate::pipeline::{AskOptions, Pipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Pipeline with shared backend clients
    pipeline: Arc<Pipeline>,
    /// Collection, models and parameters applied to every request
    ask_defaults: AskOptions,
}

impl AppState {
    /// Create state around an existing pipeline
    pub fn new(pipeline: Arc<Pipeline>, ask_defaults: AskOptions) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                ask_defaults,
            }),
        }
    }

    /// Build the pipeline and request defaults from configuration
    pub fn from_config(config: &RagConfig, settings: &Settings) -> Result<Self> {
        tracing::info!(
            "Initializing application state (index: {:?}, collection: {})",
            config.vector_index.backend,
            settings.collection_name
        );

        let pipeline = Arc::new(Pipeline::from_config(config, settings)?);
        let ask_defaults = AskOptions {
            collection: settings.collection_name.clone(),
            k: config.retrieval.top_k,
            embedding: config.embedding_request()?,
            generation: config.generation_request()?,
            params: config.generation.params.clone(),
            region: settings.region.clone(),
        };

        tracing::info!(
            "Answering with {} over {} embeddings (k={})",
            ask_defaults.generation.model_name(),
            ask_defaults.embedding.model_name(),
            ask_defaults.k
        );

        Ok(Self::new(pipeline, ask_defaults))
    }

    /// Get the pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Get the per-request defaults
    pub fn ask_defaults(&self) -> &AskOptions {
        &self.inner.ask_defaults
    }
}
