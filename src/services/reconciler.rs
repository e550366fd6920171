use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::{
    models::{Attributes, Candidate},
    services::{
        citation::{select_citations, strip_citations},
        retrieval::ProductRetriever,
    },
};

/// Assistant text with citations removed, plus the products they resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub text: String,
    pub products: Vec<Attributes>,
}

/// Turns raw model output into the client-facing reply.
///
/// Product ids are only trusted once they resolve against the catalog, so a
/// hallucinated id never reaches the caller.
#[derive(Clone)]
pub struct ResponseReconciler {
    retriever: ProductRetriever,
}

impl ResponseReconciler {
    pub fn new(retriever: ProductRetriever) -> Self {
        Self { retriever }
    }

    pub async fn reconcile(&self, raw: &str, candidates: &[Candidate]) -> Reconciled {
        let text = strip_citations(raw);
        let ids = select_citations(raw);
        if ids.is_empty() {
            return Reconciled {
                text,
                products: Vec::new(),
            };
        }

        let offered: HashSet<u32> = candidates.iter().map(|c| c.id).collect();
        for id in ids.iter().filter(|id| !offered.contains(id)) {
            debug!("Model cited product {} outside the candidate set", id);
        }

        let mut found = match self.retriever.fetch_by_ids(&ids).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Catalog lookup failed, replying without products: {}", e);
                return Reconciled {
                    text,
                    products: Vec::new(),
                };
            }
        };

        let products: Vec<Attributes> = ids
            .iter()
            .filter_map(|id| {
                let product = found.remove(id);
                if product.is_none() {
                    info!("Dropping cited product {}: not in catalog", id);
                }
                product
            })
            .collect();

        Reconciled { text, products }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog_store, FailingStore, HashEmbedder, SlowStore};
    use serde_json::json;
    use std::{sync::Arc, time::Duration};

    async fn reconciler() -> ResponseReconciler {
        let store = catalog_store(&[
            (42, json!({"name": "Red Maxi Dress", "color": "red", "price": 1200})),
            (7, json!({"name": "Red A-line Dress", "color": "red", "price": 900})),
            (1, json!({"name": "Black Kurti"})),
            (2, json!({"name": "Blue Jeans"})),
            (3, json!({"name": "White Sneakers"})),
        ])
        .await;
        ResponseReconciler::new(ProductRetriever::new(
            Arc::new(HashEmbedder::default()),
            store,
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn resolves_cited_products_and_hides_the_ids() {
        let raw = "Here are two options:\n1. Red Maxi Dress\nProduct ID: 42\n2. Red A-line Dress\nProduct ID: 7";
        let reply = reconciler().await.reconcile(raw, &[]).await;

        assert_eq!(
            reply.text,
            "Here are two options:\n1. Red Maxi Dress\n2. Red A-line Dress"
        );
        let names: Vec<_> = reply.products.iter().map(|p| p["name"].clone()).collect();
        assert_eq!(names, vec![json!("Red Maxi Dress"), json!("Red A-line Dress")]);
        assert_eq!(reply.products[0]["seq_id"], json!(42));
    }

    #[tokio::test]
    async fn hallucinated_ids_are_dropped() {
        let raw = "You might like this.\nProduct ID: 999999";
        let reply = reconciler().await.reconcile(raw, &[]).await;
        assert_eq!(reply.text, "You might like this.");
        assert!(reply.products.is_empty());
    }

    #[tokio::test]
    async fn only_the_first_four_citations_count() {
        let raw = "Picks:\nProduct ID: 1\nProduct ID: 2\nProduct ID: 3\nProduct ID: 7\nProduct ID: 42";
        let reply = reconciler().await.reconcile(raw, &[]).await;
        let ids: Vec<_> = reply.products.iter().map(|p| p["seq_id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(7)]);
        assert_eq!(reply.text, "Picks:");
    }

    #[tokio::test]
    async fn plain_replies_pass_through_untouched() {
        let raw = "  Could you tell me the occasion?  ";
        let reply = reconciler().await.reconcile(raw, &[]).await;
        assert_eq!(reply.text, "Could you tell me the occasion?");
        assert!(reply.products.is_empty());
    }

    #[tokio::test]
    async fn lookup_failures_keep_the_text() {
        let reconciler = ResponseReconciler::new(ProductRetriever::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(FailingStore),
            Duration::from_secs(1),
        ));
        let reply = reconciler.reconcile("Try this.\nProduct ID: 42", &[]).await;
        assert_eq!(reply.text, "Try this.");
        assert!(reply.products.is_empty());
    }

    #[tokio::test]
    async fn slow_lookups_keep_the_text_within_the_timeout() {
        let reconciler = ResponseReconciler::new(ProductRetriever::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(SlowStore(Duration::from_secs(5))),
            Duration::from_millis(50),
        ));
        let started = std::time::Instant::now();
        let reply = reconciler.reconcile("Try this.\nProduct ID: 42", &[]).await;
        assert_eq!(reply.text, "Try this.");
        assert!(reply.products.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
