//! In-memory doubles for the external collaborators.

use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::{
    catalog::{flatten_attributes, searchable_text},
    error::{ApiError, Result},
    models::{Attributes, ChatMessage, SEQ_ID_KEY},
    services::{
        completion::ChatModel,
        embedder::Embedder,
        vector_store::{ScoredRecord, VectorRecord, VectorStore},
    },
};

const DIMENSIONS: usize = 1024;

/// Deterministic bag-of-words embedder: each lowercase token bumps one bucket.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            // FNV-1a
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(ApiError::ExternalServiceError("embedding service down".into()))
    }
}

/// Cosine-similarity store backed by a sorted map.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<String, (Vec<f32>, Attributes)>>,
    pub queries: AtomicUsize,
    pub fetches: AtomicUsize,
    pub upserts: AtomicUsize,
}

impl InMemoryStore {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .map(|(id, (values, metadata))| ScoredRecord {
                id: id.clone(),
                score: cosine(vector, values),
                metadata: metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Attributes>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|(_, m)| (id.clone(), m.clone())))
            .collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.insert(record.id, (record.values, record.metadata));
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.records.lock().unwrap().clear();
        Ok(())
    }

    async fn heartbeat(&self) -> Result<usize> {
        Ok(self.len())
    }
}

/// Store whose every call fails, as during a network partition.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<ScoredRecord>> {
        Err(ApiError::ExternalServiceError("connection refused".into()))
    }

    async fn fetch(&self, _ids: &[String]) -> Result<HashMap<String, Attributes>> {
        Err(ApiError::ExternalServiceError("connection refused".into()))
    }

    async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<()> {
        Err(ApiError::ExternalServiceError("connection refused".into()))
    }

    async fn reset(&self) -> Result<()> {
        Err(ApiError::ExternalServiceError("connection refused".into()))
    }

    async fn heartbeat(&self) -> Result<usize> {
        Err(ApiError::ExternalServiceError("connection refused".into()))
    }
}

/// Store that hangs for the given duration before answering.
pub struct SlowStore(pub Duration);

#[async_trait]
impl VectorStore for SlowStore {
    async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<ScoredRecord>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }

    async fn fetch(&self, _ids: &[String]) -> Result<HashMap<String, Attributes>> {
        tokio::time::sleep(self.0).await;
        Ok(HashMap::new())
    }

    async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<()> {
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        Ok(())
    }

    async fn heartbeat(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Build a store holding `(id, raw product)` pairs, embedded like ingestion does.
pub async fn catalog_store(products: &[(u32, Value)]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::default());
    let records = products
        .iter()
        .map(|(id, raw)| {
            let raw = raw.as_object().cloned().unwrap_or_default();
            let mut metadata = flatten_attributes(&raw);
            metadata.insert(SEQ_ID_KEY.to_string(), Value::from(*id));
            VectorRecord {
                id: id.to_string(),
                values: HashEmbedder::vector(&searchable_text(&raw)),
                metadata,
            }
        })
        .collect();
    store.upsert(records).await.unwrap();
    store
}

/// Chat model that replays a fixed reply (or failure) and records what it saw.
pub struct ScriptedChatModel {
    reply: std::result::Result<String, String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub last_messages: Mutex<Vec<ChatMessage>>,
}

impl ScriptedChatModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reply: Err(reason.into()),
            ..Self::replying("")
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying("too late")
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .clone()
            .map_err(ApiError::ExternalServiceError)
    }
}
