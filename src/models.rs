//! Core data models shared by the ingestion and query pipelines.
//!
//! Every type here is an immutable value passed from one pipeline stage to
//! the next; nothing is mutated in place.

use serde::{Deserialize, Serialize};

/// A bounded slice of a document's extracted text, sized for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub source_file: String,
}

/// A vector entry handed to the index on upsert. After the upsert the index
/// owns it; we only see it again through similarity queries.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub content: String,
    pub source_file: String,
}

/// One similarity match returned by the vector index, ordered by descending
/// score within a result set.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievedMatch {
    pub score: f32,
    #[serde(default)]
    pub metadata: MatchMetadata,
}

/// Metadata attached to a match. Entries written by other tooling may lack
/// the `content` field, so both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchMetadata {
    pub content: Option<String>,
    pub file: Option<String>,
}

/// Request body for `POST /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Response body for `POST /query`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
}

/// Successful ingestion outcome: how many chunks were embedded and upserted
/// for the file. Zero is valid (an empty document).
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub file: String,
    pub chunks_indexed: usize,
}
