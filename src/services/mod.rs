pub mod citation;
pub mod completion;
pub mod embedder;
pub mod pinecone;
pub mod prompt;
pub mod reconciler;
pub mod recommendation;
pub mod retrieval;
pub mod retry;
pub mod vector_store;

// Re-export public types
pub use completion::{ChatModel, CompletionClient, OpenAiChatModel};
pub use embedder::{Embedder, OpenAiEmbedder};
pub use pinecone::PineconeClient;
pub use prompt::PromptBuilder;
pub use reconciler::{Reconciled, ResponseReconciler};
pub use recommendation::{RecommendationService, Stage};
pub use retrieval::ProductRetriever;
pub use retry::{retry_with_backoff, Backoff};
pub use vector_store::{ScoredRecord, VectorRecord, VectorStore};
