pub mod ingest_catalog;

pub use ingest_catalog::{ingest_catalog, ingest_products, IngestOptions, IngestReport};
