use async_trait::async_trait;
use std::collections::HashMap;

use crate::{error::Result, models::Attributes};

/// A similarity match returned by [`VectorStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    pub metadata: Attributes,
}

/// A vector with its metadata, as written by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Attributes,
}

/// Similarity search plus key-value access over one catalog collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest `top_k` records to `vector`, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;

    /// Metadata for the ids that exist; unknown ids are simply absent.
    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Attributes>>;

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Drop every record in the collection.
    async fn reset(&self) -> Result<()>;

    /// Cheap liveness probe; returns the number of stored records.
    async fn heartbeat(&self) -> Result<usize>;
}
