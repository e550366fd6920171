use crate::error::{ApiError, Result};
use config::{builder::DefaultState, ConfigBuilder, Environment};
use serde::Deserialize;
use std::{env, time::Duration};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    pub pinecone_api_key: String,
    /// Data-plane host of the index, e.g. `https://clothes-abc123.svc.us-east-1.pinecone.io`
    pub pinecone_index_host: String,
    /// Namespace holding the catalog; replaced wholesale by ingestion.
    pub collection: String,

    pub top_k: usize,
    pub audience: String,
    pub request_timeout_secs: u64,
    pub startup_retries: u32,
    pub startup_retry_delay_secs: u64,

    pub ingest_batch_size: usize,
    /// Array field read when the catalog file is an object rather than a list.
    pub catalog_field: String,
}

impl Config {
    /// Load configuration from `.env`, built-in defaults and `APP_*` variables.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = Self::defaults()?;

        // Accept the vendor-standard variable names as well
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            builder = builder.set_default("openai_api_key", key)?;
        }
        if let Ok(key) = env::var("PINECONE_API_KEY") {
            builder = builder.set_default("pinecone_api_key", key)?;
        }

        let config: Config = builder
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8000_i64)?
            .set_default("openai_api_key", "")?
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("embedding_model", "text-embedding-ada-002")?
            .set_default("chat_model", "gpt-3.5-turbo")?
            .set_default("max_tokens", 500_i64)?
            .set_default("temperature", 0.7_f64)?
            .set_default("pinecone_api_key", "")?
            .set_default("pinecone_index_host", "")?
            .set_default("collection", "Clothes_products")?
            .set_default("top_k", 5_i64)?
            .set_default("audience", "women")?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("startup_retries", 3_i64)?
            .set_default("startup_retry_delay_secs", 10_i64)?
            .set_default("ingest_batch_size", 100_i64)?
            .set_default("catalog_field", "Sheet1")?)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("openai_api_key", &self.openai_api_key),
            ("pinecone_api_key", &self.pinecone_api_key),
            ("pinecone_index_host", &self.pinecone_index_host),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ApiError::ConfigError(format!("{} must be set", name)));
            }
        }

        if self.ingest_batch_size == 0 {
            return Err(ApiError::ConfigError(
                "ingest_batch_size must be positive".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ApiError::ConfigError(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_retry_delay(&self) -> Duration {
        Duration::from_secs(self.startup_retry_delay_secs)
    }
}
