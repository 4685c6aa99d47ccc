use async_trait::async_trait;

use super::inbound::MergedBatch;

pub type ProcessorError = Box<dyn std::error::Error + Send + Sync>;

/// Handles one merged batch for a session. Implemented by the embedding
/// application; the buffer guarantees at most one call per session at a time.
#[async_trait]
pub trait ConversationProcessor: Send + Sync + 'static {
    type Context: Send + Sync + 'static;
    type Config: Send + Sync + 'static;

    async fn process(
        &self,
        batch: MergedBatch<Self::Context, Self::Config>,
    ) -> Result<(), ProcessorError>;
}
