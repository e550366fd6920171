use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, error};

use crate::{
    error::{ApiError, Result},
    models::ChatMessage,
};

/// Only the most recent turns are forwarded; older context is dropped.
pub const MAX_HISTORY_MESSAGES: usize = 10;

/// Text-in/text-out chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| ApiError::ConfigError("Invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalServiceError(format!(
                "chat completion returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::ExternalServiceError("chat completion had no content".into()))
    }
}

/// The `[..MAX_HISTORY_MESSAGES]` most recent turns, oldest first.
pub fn truncate_history(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    &history[start..]
}

/// Wraps a [`ChatModel`] with history truncation, a bounded wait and a single
/// failure class. Calls are never retried here: generation is billed per call.
#[derive(Clone)]
pub struct CompletionClient {
    model: Arc<dyn ChatModel>,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(model: Arc<dyn ChatModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        user_prompt: &str,
    ) -> Result<String> {
        let history = truncate_history(history);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_prompt));

        debug!("Sending {} messages to chat model", messages.len());
        match timeout(self.timeout, self.model.chat(&messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                error!("Chat model error: {}", e);
                Err(ApiError::BackendUnavailable(e.to_string()))
            }
            Err(_) => {
                error!("Chat model timed out after {:?}", self.timeout);
                Err(ApiError::BackendUnavailable(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
