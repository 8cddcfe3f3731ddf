//! Embedding client abstraction and the OpenAI adapter.
//!
//! Maps text to a fixed-dimension vector by calling the OpenAI embeddings
//! API. The adapter owns transport concerns; callers only ever see
//! [`EmbeddingError`]. Failures are surfaced immediately — retry policy is
//! deliberately left to the caller's caller (there is none).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::{require_env, ConfigError, EmbeddingConfig};

/// Single failure kind for the embedding adapter. Transport detail is
/// flattened into the message and never leaks as a typed transport error.
#[derive(Debug, Error)]
#[error("embedding request failed: {0}")]
pub struct EmbeddingError(pub String);

/// Maps text to a fixed-dimension vector. Implementations must be safe to
/// share across concurrent requests.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// OpenAI embeddings adapter (`POST /v1/embeddings`).
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbeddings {
    /// Build the adapter. Requires `OPENAI_API_KEY` in the environment;
    /// a missing key is a startup failure, not a per-request one.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = require_env("OPENAI_API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dims: config.dims,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError(format!("API returned {}: {}", status, detail)));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError(format!("invalid response body: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError("response contained no embeddings".to_string()))?
            .embedding;

        if vector.len() != self.dims {
            return Err(EmbeddingError(format!(
                "expected {} dimensions, got {}",
                self.dims,
                vector.len()
            )));
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embeddings_response() {
        let json = r#"{"data":[{"embedding":[0.1,-0.2,0.3],"index":0}],"model":"m"}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn missing_data_field_is_a_parse_error() {
        let json = r#"{"model":"m"}"#;
        assert!(serde_json::from_str::<EmbeddingsResponse>(json).is_err());
    }
}
