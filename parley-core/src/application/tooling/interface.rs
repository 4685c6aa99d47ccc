use async_trait::async_trait;
use serde_json::Value;

use super::definition::ToolOutput;

/// Narrow dispatch seam used by the runner: name and arguments in,
/// success/content out. Failures are reported in the output, never raised.
#[async_trait]
pub trait ToolDispatch: Send + Sync {
    async fn dispatch(&self, name: &str, arguments: Value) -> ToolOutput;
}
