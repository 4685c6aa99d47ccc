use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPhase {
    Lookup,
    Execution,
}

/// Telemetry emitted by the tool executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToolEvent {
    Start {
        tool: String,
        arguments: Value,
    },
    End {
        tool: String,
        success: bool,
        content: String,
        duration_ms: u64,
        retry_attempts: u32,
    },
    Error {
        tool: String,
        phase: ErrorPhase,
        message: String,
        attempt: u32,
    },
}

impl ToolEvent {
    pub fn tool(&self) -> &str {
        match self {
            ToolEvent::Start { tool, .. }
            | ToolEvent::End { tool, .. }
            | ToolEvent::Error { tool, .. } => tool,
        }
    }
}

/// Receives executor telemetry. Must not block.
pub trait ToolEventObserver: Send + Sync {
    fn on_event(&self, event: &ToolEvent);
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ToolEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ToolEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ToolEventObserver for ChannelObserver {
    fn on_event(&self, event: &ToolEvent) {
        // receiver gone: telemetry is optional
        let _ = self.sender.send(event.clone());
    }
}
