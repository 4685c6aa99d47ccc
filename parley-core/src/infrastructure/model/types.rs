//! Model types - Options, Reply, and Error types

use crate::types::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Tool description offered to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Per-request options for a chat round
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    /// Tool catalog; `None` withholds tools for the round.
    pub tools: Option<Vec<ToolSchema>>,
    pub session_id: Option<String>,
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Same options without the tool catalog
    pub fn without_tools(&self) -> Self {
        Self {
            tools: None,
            ..self.clone()
        }
    }
}

/// Reply from a chat round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls: Some(calls),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("chat backend '{backend}' is unavailable: {reason}")]
    Unavailable { backend: String, reason: String },
    #[error("transport error calling chat backend '{backend}': {message}")]
    Transport { backend: String, message: String },
    #[error("chat backend '{backend}' returned invalid response: {reason}")]
    InvalidResponse { backend: String, reason: String },
}

impl ModelError {
    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Short message suitable for end users
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Unavailable { backend, .. } => {
                format!("The assistant backend '{backend}' is currently unavailable.")
            }
            ModelError::Transport { backend, .. } => {
                format!("Could not reach the assistant backend '{backend}'.")
            }
            ModelError::InvalidResponse { backend, .. } => {
                format!("The assistant backend '{backend}' sent a response that could not be read.")
            }
        }
    }
}
