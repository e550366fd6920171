use crate::{
    app::connect_store,
    catalog::{load_catalog, normalize_catalog},
    config::Config,
    error::Result,
    models::Product,
    services::{
        retry_with_backoff, Backoff, Embedder, OpenAiEmbedder, PineconeClient, VectorRecord,
        VectorStore,
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::Path;
use tokio::time::{sleep, Duration};

const UPSERT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: usize,
    /// Base delay of the exponential upsert retry
    pub retry_delay: Duration,
    /// Pause between batches to stay under provider rate limits
    pub batch_pause: Duration,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.ingest_batch_size,
            retry_delay: Duration::from_secs(1),
            batch_pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub total_products: usize,
    pub indexed_products: usize,
    pub unnamed_products: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
}

impl IngestReport {
    pub fn total_batches(&self) -> usize {
        self.successful_batches + self.failed_batches
    }

    pub fn success_rate(&self) -> f64 {
        match self.total_batches() {
            0 => 100.0,
            total => self.successful_batches as f64 / total as f64 * 100.0,
        }
    }
}

/// Replace the collection contents with `products`.
///
/// The collection is wiped first. A batch that cannot be embedded, or whose
/// upsert still fails after retries, is counted and skipped.
pub async fn ingest_products(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    products: &[Product],
    options: &IngestOptions,
    progress: &ProgressBar,
) -> Result<IngestReport> {
    let batch_size = options.batch_size.max(1);
    let total_batches = (products.len() + batch_size - 1) / batch_size;
    let mut report = IngestReport {
        total_products: products.len(),
        unnamed_products: products.iter().filter(|p| p.name().trim().is_empty()).count(),
        ..IngestReport::default()
    };

    store.reset().await?;
    info!("🧹 Cleared existing collection");

    for (batch_index, batch) in products.chunks(batch_size).enumerate() {
        let batch_num = batch_index + 1;
        progress.set_message(format!("batch {}/{}", batch_num, total_batches));

        let texts: Vec<String> = batch.iter().map(|p| p.searchable_text.clone()).collect();
        let embeddings = match embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                error!("❌ Failed to embed batch {}: {}", batch_num, e);
                report.failed_batches += 1;
                progress.inc(batch.len() as u64);
                continue;
            }
        };

        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(embeddings)
            .map(|(product, values)| VectorRecord {
                id: product.vector_id(),
                values,
                metadata: product.attributes.clone(),
            })
            .collect();

        let upserted = retry_with_backoff(
            "upsert",
            UPSERT_ATTEMPTS,
            options.retry_delay,
            Backoff::Exponential,
            || store.upsert(records.clone()),
        )
        .await;

        match upserted {
            Ok(()) => {
                report.successful_batches += 1;
                report.indexed_products += records.len();
            }
            Err(e) => {
                error!("❌ Failed to index batch {} after retries: {}", batch_num, e);
                report.failed_batches += 1;
            }
        }
        progress.inc(batch.len() as u64);

        if batch_num < total_batches && !options.batch_pause.is_zero() {
            sleep(options.batch_pause).await;
        }
    }

    progress.finish_with_message("done");

    if report.unnamed_products > 0 {
        warn!("⚠️  {} products have no name", report.unnamed_products);
    }
    if report.failed_batches > 0 {
        warn!("⚠️  Some batches failed to index. Consider re-running for complete indexing.");
    }

    Ok(report)
}

/// Load the catalog at `path` and index it into the configured collection.
pub async fn ingest_catalog(config: &Config, path: &Path) -> Result<IngestReport> {
    info!("📚 Loading catalog from {}", path.display());
    let records = load_catalog(path, &config.catalog_field)?;
    let products = normalize_catalog(&records);
    info!(
        "✅ Normalized {} of {} catalog records",
        products.len(),
        records.len()
    );

    let timeout = config.request_timeout();
    let store = PineconeClient::new(
        &config.pinecone_api_key,
        &config.pinecone_index_host,
        &config.collection,
        timeout,
    )?;
    connect_store(&store, config).await?;

    let embedder = OpenAiEmbedder::new(
        &config.openai_api_key,
        &config.openai_base_url,
        &config.embedding_model,
        timeout,
    )?;

    let progress = ProgressBar::new(products.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("=>-"),
    );

    ingest_products(
        &embedder,
        &store,
        &products,
        &IngestOptions::from_config(config),
        &progress,
    )
    .await
}
