// Runner tests - the tool-calling loop wired to a real tool executor
//
// A scripted chat backend stands in for the model; tools run through
// ToolExecutor so results, failures and the catalog flow end to end.

use async_trait::async_trait;
use parley_core::agent::{FALLBACK_RESPONSE, Runner, RunnerOptions};
use parley_core::model::{ChatBackend, ChatOptions, ChatReply, ModelError};
use parley_core::tooling::{
    ExecutionContext, Tool, ToolDefinition, ToolExecutor, ToolFailure, ToolHandler, ToolOutput,
    ToolRegistry,
};
use parley_core::types::{ChatMessage, MessageRole, ToolCall};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

struct ScriptedBackend {
    replies: Mutex<VecDeque<ChatReply>>,
    seen: Mutex<Vec<(Vec<ChatMessage>, ChatOptions)>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<ChatReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(
        &self,
        transcript: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatReply, ModelError> {
        self.seen
            .lock()
            .await
            .push((transcript.to_vec(), options.clone()));
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted"))
    }
}

struct Calculator;

#[async_trait]
impl ToolHandler for Calculator {
    async fn call(&self, arguments: Value) -> Result<ToolOutput, ToolFailure> {
        let a = arguments["a"].as_i64().ok_or("missing 'a'")?;
        let b = arguments["b"].as_i64().ok_or("missing 'b'")?;
        Ok(ToolOutput::ok((a + b).to_string()))
    }
}

fn executor() -> ToolExecutor {
    let registry = ToolRegistry::shared();
    registry
        .register(Tool::handler(
            ToolDefinition::new("add", "Add two integers").with_parameters(json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}
            })),
            Calculator,
        ))
        .unwrap();
    ToolExecutor::new(registry, ExecutionContext::new("bot", "chat"))
}

fn catalog(executor: &ToolExecutor) -> RunnerOptions {
    let tools = executor
        .available_tools()
        .iter()
        .map(|definition| definition.schema())
        .collect();
    RunnerOptions::default().with_max_rounds(3).with_tools(tools)
}

#[tokio::test]
async fn tool_results_reach_the_next_round() {
    let backend = ScriptedBackend::new(vec![
        ChatReply::tool_calls(vec![ToolCall::new("add", json!("{\"a\": 2, \"b\": 3}"))]),
        ChatReply::text("2 + 3 = 5"),
    ]);
    let executor = executor();
    let runner = Runner::new(backend.clone());

    let outcome = runner
        .run(
            vec![ChatMessage::system("You add numbers."), ChatMessage::user("2+3?")],
            catalog(&executor),
            &executor,
        )
        .await
        .unwrap();

    assert_eq!(outcome.content, "2 + 3 = 5");
    assert_eq!(outcome.steps.len(), 1);
    assert!(outcome.steps[0].success);
    assert_eq!(outcome.steps[0].output, "5");

    let seen = backend.seen.lock().await;
    let (first_transcript, first_options) = &seen[0];
    assert_eq!(first_transcript.len(), 2);
    let tools = first_options.tools.as_ref().expect("catalog offered");
    assert_eq!(tools[0].name, "add");

    let (second_transcript, _) = &seen[1];
    let tool_turn = second_transcript
        .iter()
        .find(|message| message.role == MessageRole::Tool)
        .expect("tool result appended");
    assert_eq!(tool_turn.content, "5");
}

#[tokio::test]
async fn tool_failures_are_fed_back_not_raised() {
    let backend = ScriptedBackend::new(vec![
        ChatReply::tool_calls(vec![
            ToolCall::new("add", json!({"a": 1})),
            ToolCall::new("subtract", json!({"a": 1, "b": 1})),
        ]),
        ChatReply::text("I could not finish the calculation."),
    ]);
    let executor = executor();
    let runner = Runner::new(backend.clone());

    let outcome = runner
        .run(vec![ChatMessage::user("math")], catalog(&executor), &executor)
        .await
        .unwrap();

    assert_eq!(outcome.steps.len(), 2);
    assert!(!outcome.steps[0].success);
    assert!(outcome.steps[0].output.contains("missing 'b'"));
    assert_eq!(outcome.steps[1].output, "Tool 'subtract' not found");
    assert_eq!(outcome.content, "I could not finish the calculation.");
}

#[tokio::test]
async fn exhausted_round_budget_forces_a_summary() {
    let call = || ChatReply::tool_calls(vec![ToolCall::new("add", json!({"a": 1, "b": 1}))]);
    let backend = ScriptedBackend::new(vec![call(), call(), call(), ChatReply::text("")]);
    let executor = executor();
    let runner = Runner::new(backend.clone());

    let outcome = runner
        .run(vec![ChatMessage::user("loop")], catalog(&executor), &executor)
        .await
        .unwrap();

    assert_eq!(outcome.rounds, 4);
    assert_eq!(outcome.steps.len(), 3);
    assert_eq!(outcome.content, FALLBACK_RESPONSE);
    let seen = backend.seen.lock().await;
    assert!(seen[3].1.tools.is_none());
    assert_eq!(seen[3].0.last().map(|m| m.role), Some(MessageRole::System));
}

#[tokio::test]
async fn loop_guard_stops_a_stuck_model_early() {
    let backend = ScriptedBackend::new(
        (1..=8)
            .map(|a| ChatReply::tool_calls(vec![ToolCall::new("add", json!({"a": a, "b": 4 - a}))]))
            .collect(),
    );
    let executor = executor();
    let runner = Runner::new(backend.clone());
    let options = catalog(&executor).with_max_rounds(8).with_loop_guard(true);

    let outcome = runner
        .run(vec![ChatMessage::user("2+2")], options, &executor)
        .await
        .unwrap();

    // different arguments, same sum: the third identical result halts the run
    assert!(outcome.was_halted());
    assert!(outcome.halted.unwrap().contains("without progress"));
    assert_eq!(outcome.steps.len(), 3);
    assert_eq!(outcome.content, FALLBACK_RESPONSE);
    assert_eq!(backend.seen.lock().await.len(), 3);
    assert!(
        outcome
            .transcript
            .iter()
            .any(|m| m.role == MessageRole::System && m.content.contains("without progress"))
    );
}
