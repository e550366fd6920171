use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, error};

use crate::{
    error::{ApiError, Result},
    models::Attributes,
    services::vector_store::{ScoredRecord, VectorRecord, VectorStore},
};

/// REST client for a Pinecone index data plane, scoped to one namespace.
#[derive(Debug, Clone)]
pub struct PineconeClient {
    client: Client,
    base_url: String,
    namespace: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Attributes>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<Vector>,
    namespace: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct Vector {
    id: String,
    values: Vec<f32>,
    metadata: Attributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAllRequest<'a> {
    delete_all: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct FetchedVector {
    #[serde(default)]
    metadata: Option<Attributes>,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    vector_count: usize,
}

impl PineconeClient {
    pub fn new(api_key: &str, index_host: &str, namespace: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key.trim())
            .map_err(|_| ApiError::ConfigError("Invalid Pinecone API key".to_string()))?;
        headers.insert("Api-Key", key);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let host = index_host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            base_url,
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("Pinecone {} failed ({}): {}", action, status, error_text);
        Err(ApiError::ExternalServiceError(format!(
            "Pinecone {} failed with status {}",
            action, status
        )))
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let request = QueryRequest {
            namespace: &self.namespace,
            vector,
            top_k,
            include_values: false,
            include_metadata: true,
        };

        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = Self::ensure_success(response, "query").await?;

        let parsed: QueryResponse = response.json().await?;
        debug!("Pinecone query returned {} matches", parsed.matches.len());

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| ScoredRecord {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Attributes>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        params.push(("namespace", self.namespace.as_str()));

        let response = self
            .client
            .get(format!("{}/vectors/fetch", self.base_url))
            .query(&params)
            .send()
            .await?;
        let response = Self::ensure_success(response, "fetch").await?;

        let parsed: FetchResponse = response.json().await?;
        Ok(parsed
            .vectors
            .into_iter()
            .map(|(id, vector)| (id, vector.metadata.unwrap_or_default()))
            .collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let request = UpsertRequest {
            vectors: records
                .into_iter()
                .map(|r| Vector {
                    id: r.id,
                    values: r.values,
                    metadata: r.metadata,
                })
                .collect(),
            namespace: &self.namespace,
        };

        let response = self
            .client
            .post(format!("{}/vectors/upsert", self.base_url))
            .json(&request)
            .send()
            .await?;
        Self::ensure_success(response, "upsert").await?;

        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let request = DeleteAllRequest {
            delete_all: true,
            namespace: &self.namespace,
        };

        let response = self
            .client
            .post(format!("{}/vectors/delete", self.base_url))
            .json(&request)
            .send()
            .await?;

        // A namespace that was never written does not exist yet
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Namespace {} did not exist; nothing to delete", self.namespace);
            return Ok(());
        }
        Self::ensure_success(response, "delete").await?;

        Ok(())
    }

    async fn heartbeat(&self) -> Result<usize> {
        let response = self
            .client
            .post(format!("{}/describe_index_stats", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = Self::ensure_success(response, "describe_index_stats").await?;

        let stats: IndexStats = response.json().await?;
        Ok(stats
            .namespaces
            .get(&self.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }
}
