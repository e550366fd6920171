use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{ApiError, Result};

/// Maps text to embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ExternalServiceError("Embedding service returned no vector".into()))
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| ApiError::ConfigError("Invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting {} embeddings from {}", texts.len(), self.model);
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ApiError::ExternalServiceError(format!("Embedding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Embedding API error ({}): {}", status, error_text);
            return Err(ApiError::ExternalServiceError(format!(
                "Embedding API returned {}",
                status
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ApiError::SerializationError(format!("Failed to parse embedding response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(ApiError::ExternalServiceError(format!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}
