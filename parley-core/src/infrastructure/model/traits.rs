//! Model traits

use super::types::{ChatOptions, ChatReply, ModelError};
use crate::types::ChatMessage;
use async_trait::async_trait;

/// A chat-completion endpoint able to return either text or tool calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the full transcript and return the assistant reply
    async fn chat(
        &self,
        transcript: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatReply, ModelError>;
}
