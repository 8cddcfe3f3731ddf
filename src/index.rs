//! Vector index client abstraction and the Pinecone adapter.
//!
//! The index is the only durable state in the system. This adapter covers
//! the three operations the pipelines need: `upsert` a vector with its
//! content metadata, `query` the top-k most similar vectors, and `describe`
//! the index for connectivity probes. Everything else about vector search
//! belongs to the external service.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::{require_env, ConfigError, IndexConfig};
use crate::models::{IndexEntry, RetrievedMatch};

/// Single failure kind for the vector index adapter.
#[derive(Debug, Error)]
#[error("vector index request failed: {0}")]
pub struct IndexError(pub String);

/// Aggregate statistics reported by the index; used by the health check and
/// for diagnostics when retrieval fails.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexStats {
    #[serde(rename = "totalVectorCount", default)]
    pub total_vector_count: u64,
}

/// External similarity index over embedding vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-update one entry. The index keys on `entry.id`.
    async fn upsert(&self, entry: IndexEntry) -> Result<(), IndexError>;

    /// Return the `top_k` entries most similar to `vector`, ordered by
    /// descending score, with their metadata included.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>, IndexError>;

    /// Probe the index and report its statistics.
    async fn describe(&self) -> Result<IndexStats, IndexError>;
}

/// Pinecone data-plane adapter. `host` is the per-index endpoint; all calls
/// are authenticated with the `PINECONE_API_KEY` environment credential.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self, ConfigError> {
        let api_key = require_env("PINECONE_API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, IndexError> {
        let response = self
            .client
            .post(format!("{}/{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| IndexError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(IndexError(format!("API returned {}: {}", status, detail)));
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponseBody {
    #[serde(default)]
    matches: Vec<RetrievedMatch>,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, entry: IndexEntry) -> Result<(), IndexError> {
        let body = serde_json::json!({
            "vectors": [{
                "id": entry.id,
                "values": entry.values,
                "metadata": {
                    "content": entry.content,
                    "file": entry.source_file,
                },
            }],
        });
        self.post("vectors/upsert", &body).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>, IndexError> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let response = self.post("query", &body).await?;
        let parsed: QueryResponseBody = response
            .json()
            .await
            .map_err(|e| IndexError(format!("invalid response body: {}", e)))?;
        Ok(parsed.matches)
    }

    async fn describe(&self) -> Result<IndexStats, IndexError> {
        let response = self
            .post("describe_index_stats", &serde_json::json!({}))
            .await?;
        response
            .json()
            .await
            .map_err(|e| IndexError(format!("invalid response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_response_with_and_without_content() {
        let json = r#"{
            "matches": [
                {"id": "a", "score": 0.92, "metadata": {"content": "some text", "file": "a.txt"}},
                {"id": "b", "score": 0.81, "metadata": {"file": "b.txt"}},
                {"id": "c", "score": 0.50}
            ],
            "namespace": ""
        }"#;
        let parsed: QueryResponseBody = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.matches.len(), 3);
        assert_eq!(parsed.matches[0].metadata.content.as_deref(), Some("some text"));
        assert!(parsed.matches[1].metadata.content.is_none());
        assert!(parsed.matches[2].metadata.file.is_none());
    }

    #[test]
    fn parses_empty_match_list() {
        let parsed: QueryResponseBody = serde_json::from_str(r#"{"matches": []}"#).unwrap();
        assert!(parsed.matches.is_empty());
    }

    #[test]
    fn parses_index_stats() {
        let json = r#"{"dimension": 1536, "indexFullness": 0.0, "totalVectorCount": 42}"#;
        let stats: IndexStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_vector_count, 42);
    }
}
