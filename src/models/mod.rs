use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use chat::{validate_history, ChatMessage, Role};
pub use product::{display_name, scalar_to_string, Attributes, Candidate, Product, SEQ_ID_KEY};

mod chat;
mod product;

/// Body of `POST /generate-response`.
///
/// `chat_history` stays untyped here so a malformed entry produces our own
/// structured 400 instead of an extractor error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Current user utterance
    pub prompt: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub chat_history: Vec<Value>,
    /// Opaque correlation token; never used for state lookup
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Successful reply: cleaned assistant text plus up to four catalog entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub products: Vec<Attributes>,
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub detail: String,
    /// HTTP status code
    pub status: u16,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
}
