//! Document and chunk types with stable chunk keys

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deterministic chunk point IDs
const CHUNK_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c3a_9b4e_4f58_a1c7_3e5d_8b20_c914);

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or object key
    pub fn from_name(name: &str) -> Self {
        std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// Raw source document, consumed once by the ingestion pipeline
#[derive(Debug, Clone)]
pub struct Document {
    /// Document name (file name or object key); becomes the chunks' source id
    pub name: String,
    /// File type detected from the name
    pub file_type: FileType,
    /// Raw bytes
    pub data: Bytes,
}

impl Document {
    /// Create a document, detecting its type from the name
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        Self {
            file_type: FileType::from_name(&name),
            name,
            data: data.into(),
        }
    }

    /// Create a plain-text document regardless of its name
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_type: FileType::Txt,
            data: Bytes::from(text.into()),
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the document has no content
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A bounded span of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub text: String,
    /// Position of this chunk within its document (0-based)
    pub sequence_index: u32,
    /// Name of the document the chunk came from
    pub source_document_id: String,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, sequence_index: u32, source_document_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sequence_index,
            source_document_id: source_document_id.into(),
        }
    }

    /// Deterministic point ID derived from the source document and position.
    ///
    /// Re-ingesting the same document yields the same IDs, so upserts
    /// overwrite instead of duplicating.
    pub fn point_id(&self) -> Uuid {
        let key = format!("{}#{}", self.source_document_id, self.sequence_index);
        Uuid::new_v5(&CHUNK_NAMESPACE, key.as_bytes())
    }

    /// Convert to the payload stored next to the vector
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "text": self.text,
            "sequence_index": self.sequence_index,
            "source_document_id": self.source_document_id,
        })
    }

    /// Rebuild a chunk from a stored payload
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        Some(Self {
            text: payload.get("text")?.as_str()?.to_string(),
            sequence_index: u32::try_from(payload.get("sequence_index")?.as_u64()?).ok()?,
            source_document_id: payload.get("source_document_id")?.as_str()?.to_string(),
        })
    }
}

/// A chunk together with its embedding, ready to upsert
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// The chunk
    pub chunk: Chunk,
    /// Embedding vector
    pub vector: Vec<f32>,
}

impl IndexedChunk {
    /// Pair a chunk with its vector
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Sort retrieved chunks by non-increasing score, keeping ties in input order
pub fn sort_by_score(results: &mut [RetrievedChunk]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}
