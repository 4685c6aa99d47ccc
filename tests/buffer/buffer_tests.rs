// Message buffer tests - inbound traffic driving the runner end to end
//
// A conversation processor runs the tool-calling runner for every merged
// batch; time is paused so debounce windows elapse deterministically.

use async_trait::async_trait;
use parley_core::agent::{Runner, RunnerOptions};
use parley_core::buffer::{
    BufferSettings, ConversationProcessor, Enqueued, InboundMessage, MergedBatch, MessageBuffer,
    ProcessorError,
};
use parley_core::config::ParleyConfig;
use parley_core::model::{ChatBackend, ChatOptions, ChatReply, ModelError};
use parley_core::tooling::ToolDispatch;
use parley_core::tooling::ToolOutput;
use parley_core::types::{ChatMessage, MessageRole};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replies with the latest user turn, slowly.
struct EchoBackend {
    latency: Duration,
}

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn chat(
        &self,
        transcript: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<ChatReply, ModelError> {
        tokio::time::sleep(self.latency).await;
        let last_user = transcript
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        if last_user.contains("offline") {
            return Err(ModelError::unavailable("echo", "backend offline"));
        }
        Ok(ChatReply::text(format!("echo: {last_user}")))
    }
}

struct NoTools;

#[async_trait]
impl ToolDispatch for NoTools {
    async fn dispatch(&self, name: &str, _arguments: Value) -> ToolOutput {
        ToolOutput::failed(format!("Tool '{name}' not found"))
    }
}

struct Caller {
    user: String,
}

struct AgentProcessor {
    runner: Runner<EchoBackend>,
    replies: Mutex<Vec<(String, String, String)>>,
}

impl AgentProcessor {
    fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            runner: Runner::new(Arc::new(EchoBackend { latency })),
            replies: Mutex::new(Vec::new()),
        })
    }

    fn replies(&self) -> Vec<(String, String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationProcessor for AgentProcessor {
    type Context = Caller;
    type Config = RunnerOptions;

    async fn process(&self, batch: MergedBatch<Caller, RunnerOptions>) -> Result<(), ProcessorError> {
        let outcome = self
            .runner
            .run(vec![ChatMessage::user(batch.text)], batch.config, &NoTools)
            .await?;
        self.replies
            .lock()
            .unwrap()
            .push((batch.session_key, batch.context.user, outcome.content));
        Ok(())
    }
}

fn inbound(session: &str, id: &str, text: &str, user: &str) -> InboundMessage<Caller, RunnerOptions> {
    InboundMessage::new(
        session,
        id,
        text,
        Caller {
            user: user.to_string(),
        },
        RunnerOptions::default(),
    )
}

fn settings() -> BufferSettings {
    BufferSettings {
        debounce: Duration::from_millis(200),
        queue_debounce: Duration::from_millis(50),
        queue_cap: 3,
        dedup_capacity: 1_000,
    }
}

#[tokio::test(start_paused = true)]
async fn burst_becomes_one_agent_turn() {
    let processor = AgentProcessor::new(Duration::from_millis(10));
    let buffer = MessageBuffer::new(processor.clone(), settings());

    buffer.enqueue(inbound("chat-1", "m1", "hello", "alice"));
    buffer.enqueue(inbound("chat-1", "m2", "are you there?", "alice-edited"));
    tokio::time::sleep(Duration::from_secs(1)).await;

    let replies = processor.replies();
    assert_eq!(replies.len(), 1);
    let (session, user, content) = &replies[0];
    assert_eq!(session, "chat-1");
    // context of the most recent message wins
    assert_eq!(user, "alice-edited");
    assert_eq!(content, "echo: hello\nare you there?");
}

#[tokio::test(start_paused = true)]
async fn followups_wait_for_the_running_turn() {
    let processor = AgentProcessor::new(Duration::from_millis(500));
    let buffer = MessageBuffer::new(processor.clone(), settings());

    buffer.enqueue(inbound("chat-1", "m1", "first", "bob"));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(buffer.is_busy("chat-1"));

    buffer.enqueue(inbound("chat-1", "m2", "second", "bob"));
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(buffer.queued_len("chat-1"), 1);
    assert!(processor.replies().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let contents: Vec<_> = processor.replies().into_iter().map(|(_, _, c)| c).collect();
    assert_eq!(contents, vec!["echo: first", "echo: second"]);
    assert!(!buffer.is_busy("chat-1"));
}

#[tokio::test(start_paused = true)]
async fn failed_turn_does_not_stall_the_session() {
    let processor = AgentProcessor::new(Duration::from_millis(10));
    let buffer = MessageBuffer::new(processor.clone(), settings());

    buffer.enqueue(inbound("chat-9", "m1", "go offline", "carol").media());
    assert_eq!(
        buffer.enqueue(inbound("chat-9", "m2", "still there?", "carol").media()),
        Enqueued::Queued
    );
    tokio::time::sleep(Duration::from_secs(1)).await;

    let replies = processor.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].2, "echo: still there?");
    assert!(buffer.pending_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn redelivered_messages_are_ignored() {
    let processor = AgentProcessor::new(Duration::from_millis(10));
    let buffer = MessageBuffer::new(processor.clone(), settings());

    buffer.enqueue(inbound("chat-1", "m1", "hi", "dan"));
    buffer.enqueue(inbound("chat-2", "m1", "hi from two", "erin"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        buffer.enqueue(inbound("chat-1", "m1", "hi", "dan")),
        Enqueued::Duplicate
    );
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut sessions: Vec<_> = processor.replies().into_iter().map(|(s, _, _)| s).collect();
    sessions.sort();
    assert_eq!(sessions, vec!["chat-1", "chat-2"]);
}

#[tokio::test(start_paused = true)]
async fn settings_from_config_drive_the_buffer() {
    let config = ParleyConfig::from_toml(
        r#"
[buffer]
debounce_ms = 0
queue_cap = 1
"#,
    )
    .unwrap();
    let processor = AgentProcessor::new(Duration::from_millis(100));
    let buffer = MessageBuffer::new(processor.clone(), config.buffer_settings());

    assert_eq!(buffer.enqueue(inbound("c", "1", "one", "f")), Enqueued::Dispatched);
    assert_eq!(buffer.enqueue(inbound("c", "2", "two", "f")), Enqueued::Queued);
    assert_eq!(buffer.enqueue(inbound("c", "3", "three", "f")), Enqueued::Queued);
    assert_eq!(buffer.queued_len("c"), 1);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let contents: Vec<_> = processor.replies().into_iter().map(|(_, _, c)| c).collect();
    assert_eq!(contents, vec!["echo: one", "echo: three"]);
}
