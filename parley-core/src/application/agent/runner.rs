use super::errors::AgentError;
use super::instructions::{FALLBACK_RESPONSE, final_round_instruction, loop_warning, skipped_call};
use super::loop_detector::{LoopAction, LoopDetector};
use super::models::{AgentStep, RunOutcome, RunnerOptions};
use crate::model::ChatBackend;
use crate::tooling::ToolDispatch;
use crate::types::{ChatMessage, ToolCall};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives a bounded think/act exchange with a chat backend.
///
/// Rounds `0..max_rounds` may call tools; round `max_rounds` is the final
/// round, where the tool catalog is withheld and a plain-text answer is
/// requested. Tool calls of one round run sequentially in the order given.
pub struct Runner<B: ChatBackend> {
    backend: Arc<B>,
}

impl<B: ChatBackend> Runner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn run(
        &self,
        transcript: Vec<ChatMessage>,
        options: RunnerOptions,
        dispatch: &dyn ToolDispatch,
    ) -> Result<RunOutcome, AgentError> {
        let max_rounds = options.max_rounds;
        info!(max_rounds, loop_guard = options.loop_guard, "Runner started");

        let mut transcript = transcript;
        let mut steps = Vec::new();
        let mut detector = options.loop_guard.then(|| LoopDetector::new(max_rounds));
        let tool_options = if options.tools.is_empty() {
            options.chat.without_tools()
        } else {
            options.chat.clone().with_tools(options.tools.clone())
        };

        for round in 0..=max_rounds {
            let final_round = round == max_rounds;
            let request_options = if final_round {
                transcript.push(ChatMessage::system(final_round_instruction(max_rounds)));
                options.chat.without_tools()
            } else {
                tool_options.clone()
            };

            debug!(round, final_round, messages = transcript.len(), "Submitting round to chat backend");
            let reply = self.backend.chat(&transcript, &request_options).await?;

            if final_round || !reply.has_tool_calls() {
                if reply.has_tool_calls() {
                    warn!(round, "Ignoring tool calls requested on the final round");
                }
                let content = if reply.content.trim().is_empty() {
                    warn!(round, "Chat backend returned empty text, using fallback response");
                    FALLBACK_RESPONSE.to_string()
                } else {
                    reply.content
                };
                transcript.push(ChatMessage::assistant(content.clone()));
                info!(rounds = round + 1, tool_calls = steps.len(), "Runner returned final response");
                return Ok(RunOutcome {
                    content,
                    rounds: round + 1,
                    steps,
                    transcript,
                    halted: None,
                });
            }

            let calls: Vec<ToolCall> = reply
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| match call.id {
                    Some(_) => call,
                    None => call.with_id(format!("call_{}", uuid::Uuid::new_v4().simple())),
                })
                .collect();
            transcript.push(ChatMessage::assistant_tool_calls(reply.content, calls.clone()));

            let mut warnings: Vec<String> = Vec::new();
            for (index, call) in calls.iter().enumerate() {
                let name = call.function.name.as_str();
                let arguments = parse_arguments(&call.function.arguments);
                info!(round, tool = %name, "Runner dispatching tool call");
                let output = dispatch.dispatch(name, arguments.clone()).await;
                transcript.push(ChatMessage::tool(output.content.clone(), call.id.clone()));
                steps.push(AgentStep {
                    round,
                    tool: name.to_string(),
                    input: arguments.clone(),
                    success: output.success,
                    output: output.content.clone(),
                });

                let Some(detector) = detector.as_mut() else {
                    continue;
                };
                detector.record_call(name, &arguments, &output.content);
                let verdict = detector.check();
                match verdict.action {
                    LoopAction::Continue => {}
                    LoopAction::Warn => {
                        warn!(round, tool = %name, reason = %verdict.reason, "Loop detector warning");
                        if !warnings.contains(&verdict.reason) {
                            warnings.push(verdict.reason);
                        }
                    }
                    LoopAction::Break => {
                        warn!(round, tool = %name, reason = %verdict.reason, "Loop detector stopped the run");
                        // every requested call needs an answering tool turn
                        for skipped in &calls[index + 1..] {
                            transcript.push(ChatMessage::tool(
                                skipped_call(&verdict.reason),
                                skipped.id.clone(),
                            ));
                        }
                        return Ok(RunOutcome {
                            content: FALLBACK_RESPONSE.to_string(),
                            rounds: round + 1,
                            steps,
                            transcript,
                            halted: Some(verdict.reason),
                        });
                    }
                }
            }

            if !warnings.is_empty() {
                transcript.push(ChatMessage::system(loop_warning(&warnings.join("; "))));
            }
        }

        // every path through the final round returns above
        Ok(RunOutcome {
            content: FALLBACK_RESPONSE.to_string(),
            rounds: max_rounds + 1,
            steps,
            transcript,
            halted: None,
        })
    }
}

/// Accepts object arguments as-is and decodes JSON-string arguments.
fn parse_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(text) if text.trim().is_empty() => Value::Object(Map::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(other) => wrap_input(other),
            Err(_) => wrap_input(Value::String(text.clone())),
        },
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => raw.clone(),
        other => wrap_input(other.clone()),
    }
}

fn wrap_input(value: Value) -> Value {
    let mut map = Map::new();
    map.insert("input".to_string(), value);
    Value::Object(map)
}
