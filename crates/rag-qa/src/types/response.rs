//! Response types for ask and collection operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer produced by the generative model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    text: String,
}

impl Answer {
    /// Wrap completion text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The completion text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Take ownership of the completion text
    pub fn into_text(self) -> String {
        self.text
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of a full ask pipeline run
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Generated answer
    pub answer: Answer,
    /// Number of chunks rendered into the prompt context
    pub chunks_used: usize,
}

/// Body returned by `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    /// Generated answer text
    pub answer: String,
}

/// Collection status as reported by the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// Ready for queries
    Green,
    /// Optimizing; queries still served
    Yellow,
    /// Operation failed
    Red,
    /// Optimization pending
    Grey,
}

impl CollectionStatus {
    /// Parse the index service status string
    pub fn parse(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "red" => Self::Red,
            _ => Self::Grey,
        }
    }
}

/// Collection metadata returned by `describe`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Number of stored points (one per chunk)
    pub points_count: u64,
    /// Number of stored vectors, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors_count: Option<u64>,
    /// Vector dimensionality
    pub dimensions: usize,
    /// Distance function
    pub distance: String,
    /// Collection status
    pub status: CollectionStatus,
}

/// Collection state after a successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionState {
    /// Collection name
    pub collection: String,
    /// Ingested document name
    pub document: String,
    /// Number of chunks upserted from the document
    pub chunks_upserted: usize,
    /// Collection metadata after the upsert
    pub info: CollectionInfo,
    /// Completion timestamp
    pub completed_at: DateTime<Utc>,
}
