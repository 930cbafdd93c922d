//! OpenAI-compatible embedding provider adapter.
//!
//! Calls the `/embeddings` endpoint. Works with OpenAI itself and with
//! servers that mimic its API (Ollama, vLLM, LM Studio, Azure OpenAI).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

/// Texts sent per request when the server does not say otherwise.
const DEFAULT_BATCH: usize = 256;

/// Connection settings for an `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// Falls back to `OPENAI_API_KEY`; local servers usually need none.
    pub api_key: Option<String>,
    /// API base URL, including the `/v1` suffix.
    pub base_url: String,
    pub model: String,
    /// Length of the returned vectors.
    pub dimension: usize,
    pub timeout_secs: u64,
    /// Maximum texts per request; larger batches are split.
    pub max_batch_size: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingConfig::default())
    }
}

impl From<&EmbeddingConfig> for OpenAiEmbeddingConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
            max_batch_size: DEFAULT_BATCH,
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn call_embeddings_api(&self, texts: Vec<String>) -> DomainResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let request_body = EmbeddingsRequest {
            model: self.config.model.clone(),
            input: texts,
        };

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(key) = self.config.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout(self.config.timeout_secs * 1000)
            } else {
                DomainError::Unavailable(format!("Embedding API request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::Unavailable(format!(
                "Embedding API returned {status}: {body}"
            )));
        }

        let result: EmbeddingsResponse = response.json().await.map_err(|e| {
            DomainError::SerializationError(format!("Failed to parse embedding response: {e}"))
        })?;

        // `data` is not guaranteed to follow input order.
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let results = self.call_embeddings_api(vec![text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::ExecutionFailed("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.max_batch_size.max(1)) {
            let vectors = self.call_embeddings_api(chunk.to_vec()).await?;
            if vectors.len() != chunk.len() {
                return Err(DomainError::ExecutionFailed(format!(
                    "Embedding API returned {} vectors for {} inputs",
                    vectors.len(),
                    chunk.len()
                )));
            }
            all_vectors.extend(vectors);
        }

        Ok(all_vectors)
    }
}

// -- wire types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
