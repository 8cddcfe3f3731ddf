//! Ingestion pipeline orchestration.
//!
//! Composes extractor → chunker → embedding client → vector index for one
//! uploaded file. Every step is a hard gate: a failure aborts the file and
//! nothing downstream runs. The upload is spooled to scoped temporary
//! storage that is removed on every exit path, success or failure.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingClient;
use crate::extract::{extract_text, ExtractError, FileKind};
use crate::index::VectorIndex;
use crate::models::{IndexEntry, IngestReport};

/// Typed ingestion failure, one kind per pipeline gate.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("failed to spool upload to temporary storage: {0}")]
    Storage(std::io::Error),
    #[error("indexing failed at chunk {chunk} of {file}: {reason}")]
    Indexing {
        file: String,
        chunk: usize,
        reason: String,
    },
}

/// Turns one uploaded file into indexed vector entries.
///
/// Holds shared handles to the external clients; safe for concurrent use by
/// simultaneous requests. No state survives between invocations.
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
}

impl IngestPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            chunking,
        }
    }

    /// Ingest one uploaded file end to end.
    ///
    /// Zero chunks (an empty document) is a success with `chunks_indexed`
    /// of 0. A mid-file embedding or upsert failure aborts the remaining
    /// chunks; entries already upserted stay in the index (re-ingesting the
    /// file overwrites them — entry IDs are deterministic).
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestReport, IngestError> {
        let kind = FileKind::from_filename(filename).ok_or_else(|| {
            warn!(file = filename, "rejected upload with unsupported extension");
            IngestError::UnsupportedFileType(filename.to_string())
        })?;

        // NamedTempFile deletes itself on drop, which covers every exit
        // path below, including the error returns.
        let mut spool = tempfile::NamedTempFile::new().map_err(IngestError::Storage)?;
        spool.write_all(bytes).map_err(IngestError::Storage)?;
        spool.flush().map_err(IngestError::Storage)?;

        info!(file = filename, "extracting text");
        let text = extract_text(spool.path(), kind).map_err(|e| {
            error!(file = filename, error = %e, "extraction failed");
            e
        })?;

        let chunks = chunk_text(
            filename,
            &text,
            self.chunking.chunk_size,
            self.chunking.chunk_overlap,
        );
        info!(file = filename, chunks = chunks.len(), "chunked document");

        let mut indexed = 0usize;
        for (i, chunk) in chunks.iter().enumerate() {
            let vector = self.embedder.embed(&chunk.content).await.map_err(|e| {
                error!(
                    file = filename,
                    chunk = i,
                    error = %e,
                    "embedding failed, aborting remaining chunks"
                );
                IngestError::Indexing {
                    file: filename.to_string(),
                    chunk: i,
                    reason: e.to_string(),
                }
            })?;

            let entry = IndexEntry {
                id: entry_id(filename, i, &chunk.content),
                values: vector,
                content: chunk.content.clone(),
                source_file: chunk.source_file.clone(),
            };
            self.index.upsert(entry).await.map_err(|e| {
                error!(
                    file = filename,
                    chunk = i,
                    error = %e,
                    "upsert failed, aborting remaining chunks"
                );
                IngestError::Indexing {
                    file: filename.to_string(),
                    chunk: i,
                    reason: e.to_string(),
                }
            })?;
            indexed += 1;
        }

        info!(file = filename, chunks = indexed, "document indexed");
        Ok(IngestReport {
            file: filename.to_string(),
            chunks_indexed: indexed,
        })
    }
}

/// Deterministic entry ID over the identifying fields, so re-ingesting a
/// file upserts its chunks in place instead of duplicating them.
fn entry_id(file: &str, chunk_index: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.as_bytes());
    hasher.update((chunk_index as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
