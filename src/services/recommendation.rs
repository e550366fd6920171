use std::fmt;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{validate_history, ChatMessage, GenerateRequest, GenerateResponse},
    services::{
        completion::CompletionClient, prompt::PromptBuilder, reconciler::ResponseReconciler,
        retrieval::ProductRetriever,
    },
};

/// Progress of one request through the pipeline. Failure at any stage is an
/// `Err(ApiError)` returned from [`RecommendationService::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Retrieved,
    Prompted,
    Completed,
    Reconciled,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Retrieved => "retrieved",
            Stage::Prompted => "prompted",
            Stage::Completed => "completed",
            Stage::Reconciled => "reconciled",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// A validated request: trimmed prompt and typed history.
#[derive(Debug)]
struct Turn {
    prompt: String,
    history: Vec<ChatMessage>,
}

#[derive(Clone)]
pub struct RecommendationService {
    retriever: ProductRetriever,
    prompt_builder: PromptBuilder,
    completion: CompletionClient,
    reconciler: ResponseReconciler,
    top_k: usize,
}

impl RecommendationService {
    pub fn new(
        retriever: ProductRetriever,
        prompt_builder: PromptBuilder,
        completion: CompletionClient,
        top_k: usize,
    ) -> Self {
        Self {
            reconciler: ResponseReconciler::new(retriever.clone()),
            retriever,
            prompt_builder,
            completion,
            top_k,
        }
    }

    /// Run one conversational turn end to end.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let request_id = request
            .session_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!("generate", request_id = %request_id);

        self.run(request).instrument(span).await
    }

    async fn run(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        advance(Stage::Received);
        let turn = validate(request)?;
        advance(Stage::Validated);

        let candidates = self.retriever.search(&turn.prompt, self.top_k).await;
        advance(Stage::Retrieved);

        let system_prompt = self.prompt_builder.build_system_prompt(&candidates);
        advance(Stage::Prompted);

        let raw = self
            .completion
            .complete(&system_prompt, &turn.history, &turn.prompt)
            .await
            .map_err(Self::fail_completion)?;
        advance(Stage::Completed);

        let reconciled = self.reconciler.reconcile(&raw, &candidates).await;
        advance(Stage::Reconciled);

        info!(
            "Replying with {} of {} candidate products",
            reconciled.products.len(),
            candidates.len()
        );
        advance(Stage::Responded);

        Ok(GenerateResponse {
            response: reconciled.text,
            products: reconciled.products,
        })
    }

    /// Completion failures end the request; the caller only ever sees the
    /// fixed backend-unavailable detail.
    fn fail_completion(err: ApiError) -> ApiError {
        warn!("Completion stage failed: {}", err);
        match err {
            ApiError::BackendUnavailable(_) => err,
            other => ApiError::BackendUnavailable(other.to_string()),
        }
    }
}

fn advance(stage: Stage) {
    tracing::debug!(%stage, "stage reached");
}

fn validate(request: GenerateRequest) -> Result<Turn> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::InvalidInput("Prompt must not be empty".to_string()));
    }

    let history = validate_history(&request.chat_history)?;

    Ok(Turn {
        prompt: prompt.to_string(),
        history,
    })
}
