use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(ApiError::InvalidInput(format!(
                "Invalid chat_history format: unknown role '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Validate one raw history entry. Extra keys are ignored.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let invalid = |reason: &str| {
            ApiError::InvalidInput(format!(
                "Invalid chat_history format: entry {} {}",
                index, reason
            ))
        };

        let entry = value
            .as_object()
            .ok_or_else(|| invalid("is not an object"))?;

        let role = match entry.get("role") {
            Some(Value::String(role)) => role.parse::<Role>()?,
            Some(_) => return Err(invalid("has a non-string role")),
            None => return Err(invalid("is missing 'role'")),
        };

        let content = match entry.get("content") {
            Some(Value::String(content)) => content.clone(),
            Some(_) => return Err(invalid("has non-string content")),
            None => return Err(invalid("is missing 'content'")),
        };

        Ok(Self { role, content })
    }
}

/// Validate a whole history, preserving chronological order.
pub fn validate_history(history: &[Value]) -> Result<Vec<ChatMessage>> {
    history
        .iter()
        .enumerate()
        .map(|(index, value)| ChatMessage::from_value(index, value))
        .collect()
}
