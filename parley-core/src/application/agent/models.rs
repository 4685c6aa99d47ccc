use serde::Serialize;
use serde_json::Value;

use crate::model::{ChatOptions, ToolSchema};
use crate::types::ChatMessage;

pub const DEFAULT_MAX_ROUNDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub round: usize,
    pub tool: String,
    pub input: Value,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final text answer (or the fallback response).
    pub content: String,
    /// Backend round-trips made.
    pub rounds: usize,
    pub steps: Vec<AgentStep>,
    pub transcript: Vec<ChatMessage>,
    /// Loop-guard reason when the run was stopped early.
    pub halted: Option<String>,
}

impl RunOutcome {
    pub fn tool_calls(&self) -> usize {
        self.steps.len()
    }

    pub fn was_halted(&self) -> bool {
        self.halted.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Think/act rounds before the forced text-only round.
    pub max_rounds: usize,
    /// Track tool calls with a fresh loop detector for this run.
    pub loop_guard: bool,
    pub tools: Vec<ToolSchema>,
    pub chat: ChatOptions,
}

impl RunnerOptions {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_loop_guard(mut self, enabled: bool) -> Self {
        self.loop_guard = enabled;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_chat_options(mut self, chat: ChatOptions) -> Self {
        self.chat = chat;
        self
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            loop_guard: false,
            tools: Vec::new(),
            chat: ChatOptions::default(),
        }
    }
}
