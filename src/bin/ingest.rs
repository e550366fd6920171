use anyhow::Context;
use console::style;
use log::info;
use std::{env, path::PathBuf};
use stylist_api::{config::Config, scripts::ingest_catalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CATALOG: &str = "Fashion_Dataset.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stylist_api=info,ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG));

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        "🚀 Ingesting {} into collection {}",
        path.display(),
        config.collection
    );

    let report = ingest_catalog(&config, &path)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    println!();
    println!("{}", style("Ingestion complete").bold().green());
    println!("  Products indexed:   {}/{}", report.indexed_products, report.total_products);
    println!("  Successful batches: {}", style(report.successful_batches).green());
    let failed = if report.failed_batches > 0 {
        style(report.failed_batches).red()
    } else {
        style(report.failed_batches).dim()
    };
    println!("  Failed batches:     {}", failed);
    println!("  Missing names:      {}", report.unnamed_products);
    println!("  Success rate:       {:.1}%", report.success_rate());

    if report.failed_batches > 0 {
        println!(
            "{}",
            style("Some batches failed; re-run to index the full catalog.").yellow()
        );
    }

    Ok(())
}
