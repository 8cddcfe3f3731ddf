//! Query pipeline: embed → retrieve → assemble context → prompt → generate.
//!
//! Each stage fails with its own [`QueryError`] kind, and two stages have a
//! distinct non-error "nothing relevant found" outcome: retrieval returning
//! zero matches, and retrieved matches carrying no usable content. Both
//! reach the caller as a normal [`QueryResponse`] with an explanatory
//! message — a hard failure is reserved for infrastructure problems. That
//! distinction is the contract of this module; the HTTP layer depends on it.

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::GenerationConfig;
use crate::embedding::EmbeddingClient;
use crate::generation::GenerationClient;
use crate::index::VectorIndex;
use crate::models::{QueryResponse, RetrievedMatch};

/// Number of matches retrieved per query. Not configurable per request.
pub const TOP_K: usize = 3;

/// Returned when retrieval finds no matches at all.
pub const NO_MATCHES_RESPONSE: &str =
    "I'm sorry, I couldn't find any relevant information in the database.";

/// Returned when matches exist but none carries usable content.
pub const NO_CONTENT_RESPONSE: &str =
    "No relevant information found in the database. Please refine your query.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Typed query failure, one kind per pipeline stage.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query embedding failed: {0}")]
    Embedding(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("context assembly failed: {0}")]
    ContextAssembly(String),
    #[error("answer generation failed: {0}")]
    Generation(String),
}

/// Answers one question against the indexed corpus.
///
/// Holds shared handles to the external clients; safe for concurrent use by
/// simultaneous requests. No state survives between invocations.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerationClient>,
    generation: GenerationConfig,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationClient>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            generation,
        }
    }

    /// Run the full five-stage pipeline for `query`. An error from any
    /// stage short-circuits the stages after it.
    pub async fn answer(&self, query: &str) -> Result<QueryResponse, QueryError> {
        info!(query, "processing query");

        let vector = self.embedder.embed(query).await.map_err(|e| {
            error!(query, error = %e, "query embedding failed");
            QueryError::Embedding(e.to_string())
        })?;

        let matches = match self.index.query(&vector, TOP_K).await {
            Ok(matches) => matches,
            Err(e) => {
                error!(query, error = %e, "retrieval failed");
                // Best-effort diagnostic: record whether the index is
                // reachable and how many vectors it holds.
                match self.index.describe().await {
                    Ok(stats) => warn!(
                        total_vectors = stats.total_vector_count,
                        "index stats at retrieval failure"
                    ),
                    Err(stats_err) => warn!(error = %stats_err, "index stats unavailable"),
                }
                return Err(QueryError::Retrieval(e.to_string()));
            }
        };

        if matches.is_empty() {
            warn!(query, "no relevant entries found");
            return Ok(QueryResponse {
                query: query.to_string(),
                response: NO_MATCHES_RESPONSE.to_string(),
            });
        }
        info!(query, matches = matches.len(), "retrieved candidate context");

        let Some(context) = assemble_context(&matches) else {
            warn!(query, "retrieved entries carry no usable content");
            return Ok(QueryResponse {
                query: query.to_string(),
                response: NO_CONTENT_RESPONSE.to_string(),
            });
        };

        let prompt = build_prompt(&context, query);

        let raw = self
            .generator
            .complete(
                SYSTEM_PROMPT,
                &prompt,
                self.generation.max_tokens,
                self.generation.temperature,
            )
            .await
            .map_err(|e| {
                error!(query, error = %e, "answer generation failed");
                QueryError::Generation(e.to_string())
            })?;

        Ok(QueryResponse {
            query: query.to_string(),
            response: raw.trim().to_string(),
        })
    }
}

/// Join the content of every match that has it, newline-separated. `None`
/// when no match contributes anything usable.
pub fn assemble_context(matches: &[RetrievedMatch]) -> Option<String> {
    let context = matches
        .iter()
        .filter_map(|m| m.metadata.content.as_deref())
        .collect::<Vec<_>>()
        .join("\n");
    if context.trim().is_empty() {
        None
    } else {
        Some(context)
    }
}

/// The fixed prompt template handed to the generation client.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!("Context: {}\n\nQuestion: {}\n\nAnswer:", context, query)
}
