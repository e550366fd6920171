use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    error::{ApiError, Result},
    models::{Attributes, Candidate, SEQ_ID_KEY},
    services::{embedder::Embedder, vector_store::VectorStore},
};

/// Smallest candidate pool handed to the model.
pub const MIN_TOP_K: usize = 5;
/// Largest candidate pool; beyond this the prompt grows without helping recall.
pub const MAX_TOP_K: usize = 30;

/// Semantic product search and id lookup over the catalog collection.
#[derive(Clone)]
pub struct ProductRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl ProductRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, timeout: Duration) -> Self {
        Self {
            embedder,
            store,
            timeout,
        }
    }

    /// Top-`k` nearest products for `query`.
    ///
    /// Never fails: a blank query, an empty store and a failing or slow backend
    /// all produce an empty candidate set.
    pub async fn search(&self, query: &str, k: usize) -> Vec<Candidate> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let k = k.clamp(MIN_TOP_K, MAX_TOP_K);
        let outcome = match timeout(self.timeout, self.try_search(query, k)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::ExternalServiceError(format!(
                "retrieval timed out after {:?}",
                self.timeout
            ))),
        };

        match outcome {
            Ok(candidates) => {
                if candidates.is_empty() {
                    info!("No products found for query");
                } else {
                    info!("Found {} candidate products", candidates.len());
                }
                candidates
            }
            Err(e) => Self::degrade_retrieval(e),
        }
    }

    /// Retrieval failures are absorbed: the reply continues without suggestions.
    fn degrade_retrieval(err: ApiError) -> Vec<Candidate> {
        warn!("Degraded retrieval, continuing without candidates: {}", err);
        Vec::new()
    }

    async fn try_search(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let embedding = self.embedder.embed(query).await?;
        let matches = self.store.query(&embedding, k).await?;

        Ok(matches
            .into_iter()
            .filter_map(|m| match parse_product_id(&m.id, &m.metadata) {
                Some(id) => {
                    debug!("Candidate {} scored {:.4}", id, m.score);
                    Some(Candidate::from_attributes(id, &m.metadata))
                }
                None => {
                    warn!("Skipping match with non-numeric id '{}'", m.id);
                    None
                }
            })
            .collect())
    }

    /// Attributes for each id present in the catalog. Missing ids are absent
    /// from the map; only transport failures are errors.
    pub async fn fetch_by_ids(&self, ids: &[u32]) -> Result<HashMap<u32, Attributes>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = ids.iter().map(u32::to_string).collect();
        let fetched = timeout(self.timeout, self.store.fetch(&keys))
            .await
            .map_err(|_| {
                ApiError::ExternalServiceError(format!(
                    "catalog lookup timed out after {:?}",
                    self.timeout
                ))
            })??;

        Ok(fetched
            .into_iter()
            .filter_map(|(key, attributes)| {
                parse_product_id(&key, &attributes).map(|id| (id, attributes))
            })
            .collect())
    }
}

/// Vector ids are decimal product ids; fall back to the mirrored `seq_id`.
fn parse_product_id(key: &str, attributes: &Attributes) -> Option<u32> {
    key.parse::<u32>()
        .ok()
        .or_else(|| attributes.get(SEQ_ID_KEY).and_then(whole_number))
        .filter(|id| *id > 0)
}

/// Pinecone hands numeric metadata back as floats (`42.0`).
fn whole_number(value: &serde_json::Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog_store, FailingStore, HashEmbedder, SlowStore};
    use serde_json::json;

    fn retriever(store: Arc<dyn VectorStore>) -> ProductRetriever {
        ProductRetriever::new(Arc::new(HashEmbedder::default()), store, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn finds_the_closest_products_first() {
        let store = catalog_store(&[
            (42, json!({"name": "Red Maxi Dress", "color": "red"})),
            (7, json!({"name": "Red A-line Dress", "color": "red"})),
            (3, json!({"name": "Blue Denim Jacket", "color": "blue"})),
        ])
        .await;

        let candidates = retriever(store).search("red maxi dress", 5).await;
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].id, 42);
        assert_eq!(candidates[0].name, "Red Maxi Dress");
    }

    #[tokio::test]
    async fn blank_queries_return_nothing() {
        let store = catalog_store(&[(1, json!({"name": "Anything"}))]).await;
        assert!(retriever(store).search("   ", 5).await.is_empty());
    }

    #[tokio::test]
    async fn store_failures_degrade_to_empty() {
        let candidates = retriever(Arc::new(FailingStore)).search("red dress", 5).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn slow_stores_are_bounded_by_the_timeout() {
        let store = Arc::new(SlowStore(Duration::from_secs(5)));
        let started = std::time::Instant::now();
        assert!(retriever(store).search("red dress", 5).await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn fetch_skips_unknown_ids() {
        let store = catalog_store(&[(42, json!({"name": "Red Maxi Dress"}))]).await;
        let found = retriever(store).fetch_by_ids(&[42, 999_999]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&42]["name"], json!("Red Maxi Dress"));
    }

    #[tokio::test]
    async fn fetch_surfaces_transport_errors() {
        assert!(retriever(Arc::new(FailingStore))
            .fetch_by_ids(&[1])
            .await
            .is_err());
    }

    #[test]
    fn ids_fall_back_to_seq_id() {
        let attributes = json!({"seq_id": 12}).as_object().cloned().unwrap();
        assert_eq!(parse_product_id("12", &Attributes::new()), Some(12));
        assert_eq!(parse_product_id("sku-12", &attributes), Some(12));
        assert_eq!(parse_product_id("0", &Attributes::new()), None);
        assert_eq!(parse_product_id("sku", &Attributes::new()), None);
    }

    #[test]
    fn float_seq_ids_from_the_store_are_accepted() {
        let whole = json!({"seq_id": 42.0}).as_object().cloned().unwrap();
        let fractional = json!({"seq_id": 42.5}).as_object().cloned().unwrap();
        let negative = json!({"seq_id": -3.0}).as_object().cloned().unwrap();
        assert_eq!(parse_product_id("sku-42", &whole), Some(42));
        assert_eq!(parse_product_id("sku-42", &fractional), None);
        assert_eq!(parse_product_id("sku-3", &negative), None);
    }

    #[tokio::test]
    async fn slow_lookups_time_out_as_errors() {
        let retriever = ProductRetriever::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(SlowStore(Duration::from_secs(5))),
            Duration::from_millis(50),
        );
        let started = std::time::Instant::now();
        let err = retriever.fetch_by_ids(&[42]).await.unwrap_err();
        assert!(matches!(err, ApiError::ExternalServiceError(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
