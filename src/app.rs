use crate::{
    config::Config,
    error::Result,
    routes::api_routes,
    services::{
        retry_with_backoff, Backoff, CompletionClient, OpenAiChatModel, OpenAiEmbedder,
        PineconeClient, ProductRetriever, PromptBuilder, RecommendationService, VectorStore,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;
use std::{net::TcpListener, sync::Arc};

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)
            .with_context(|| format!("Failed to bind {}", bind_address))?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let recommendation_service = web::Data::new(self.build_service().await?);

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(recommendation_service.clone())
                .configure(api_routes)
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }

    /// Wire the external clients into the request pipeline. Fails if the
    /// vector store cannot be reached within the startup retry budget.
    pub async fn build_service(&self) -> Result<RecommendationService> {
        let config = &self.config;
        let timeout = config.request_timeout();

        let store = Arc::new(
            PineconeClient::new(
                &config.pinecone_api_key,
                &config.pinecone_index_host,
                &config.collection,
                timeout,
            )
            .context("Failed to initialize Pinecone client")?,
        );
        let vector_count = connect_store(store.as_ref(), config).await?;
        info!(
            "Connected to collection {} ({} products)",
            config.collection, vector_count
        );

        let embedder = Arc::new(
            OpenAiEmbedder::new(
                &config.openai_api_key,
                &config.openai_base_url,
                &config.embedding_model,
                timeout,
            )
            .context("Failed to initialize embedding client")?,
        );
        let chat_model = Arc::new(
            OpenAiChatModel::new(
                &config.openai_api_key,
                &config.openai_base_url,
                &config.chat_model,
                config.max_tokens,
                config.temperature,
                timeout,
            )
            .context("Failed to initialize chat client")?,
        );

        Ok(RecommendationService::new(
            ProductRetriever::new(embedder, store, timeout),
            PromptBuilder::new(config.audience.as_str()),
            CompletionClient::new(chat_model, timeout),
            config.top_k,
        ))
    }
}

/// Heartbeat the store with a fixed delay between attempts.
pub async fn connect_store(store: &dyn VectorStore, config: &Config) -> Result<usize> {
    retry_with_backoff(
        "vector store heartbeat",
        config.startup_retries,
        config.startup_retry_delay(),
        Backoff::Fixed,
        || store.heartbeat(),
    )
    .await
}
