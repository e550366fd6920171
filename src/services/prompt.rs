use std::fmt::Write;

use crate::{
    models::Candidate,
    services::citation::{citation_line, MAX_CITATIONS},
};

const CANDIDATE_HEADER: &str = "Available products (suggest only when appropriate):";
const NO_CANDIDATES: &str = "No products are available for this request. Do not recommend any product; reply conversationally or ask a clarifying question.";

/// Builds the grounding-constrained system prompt for one request.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    audience: String,
    max_recommendations: usize,
}

impl PromptBuilder {
    /// `audience` is the single catalog restriction, e.g. `"women"`.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            max_recommendations: MAX_CITATIONS,
        }
    }

    pub fn build_system_prompt(&self, candidates: &[Candidate]) -> String {
        let audience = &self.audience;
        let max = self.max_recommendations;
        let mut prompt = String::new();

        // Persona and catalog scope
        prompt.push_str(
            "You are a polite and empathetic chatbot specializing in CLOTHING and fashion advice. \
             Your primary goal is to understand the user's preferences, such as clothing type, \
             preferred colors, occasion, style (casual, formal, ethnic) and fabric sensitivities, \
             before offering product suggestions. ",
        );
        let _ = write!(
            prompt,
            "You can only suggest products for {audience}. If someone asks for products for anyone \
             else, politely respond that you can only recommend {audience}'s clothing.\n\n"
        );

        // Clarification policy
        prompt.push_str(
            "If the user's query is vague or lacks sufficient context, do not recommend anything \
             yet. Ask a polite follow-up question to clarify instead.\n\n",
        );

        // Grounding
        prompt.push_str(
            "You MUST only recommend products from the list of available products below. \
             Cite only the ids shown in that list. Never guess or invent a Product ID. \
             Never suggest a product without its Product ID; if no listed product fits, say so.\n\n",
        );

        // Output contract
        let _ = write!(
            prompt,
            "When you recommend products, use this exact format for each item:\n\
             <Product Name>\n\
             {}\n\
             Put the Product ID line on its own line directly below the product name.\n\
             Recommend a maximum of {max} products.\n\
             Do not mention images; the frontend displays them.\n\
             Do not add extra descriptions unless the user explicitly asks.\n\n",
            citation_line("<numeric_id>")
        );

        if candidates.is_empty() {
            prompt.push_str(NO_CANDIDATES);
            prompt.push('\n');
        } else {
            prompt.push_str(CANDIDATE_HEADER);
            prompt.push('\n');
            for candidate in candidates {
                let _ = writeln!(prompt, "{}. {}", candidate.id, candidate.name);
            }
        }

        prompt
    }
}
