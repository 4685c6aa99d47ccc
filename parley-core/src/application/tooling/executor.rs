use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use super::definition::{Tool, ToolDefinition, ToolOutput};
use super::events::{ErrorPhase, ToolEvent, ToolEventObserver};
use super::interface::ToolDispatch;
use super::registry::ToolRegistry;

pub const BOT_ID_KEY: &str = "_bot_id";
pub const CHAT_ID_KEY: &str = "_chat_id";
pub const RETRY_ATTEMPT_KEY: &str = "_retry_attempt";
pub const PREVIOUS_ERROR_KEY: &str = "_previous_error";

pub const DEFAULT_LOG_CAPACITY: usize = 100;
const LOG_RESULT_LIMIT: usize = 500;

/// Identifiers injected into every tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub bot_id: Option<String>,
    pub chat_id: Option<String>,
}

impl ExecutionContext {
    pub fn new(bot_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_id: Some(bot_id.into()),
            chat_id: Some(chat_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExecutionResult {
    pub success: bool,
    pub content: String,
    pub tool_name: String,
    pub args: Value,
    pub duration_ms: u64,
    pub retry_attempts: u32,
}

impl ToolExecutionResult {
    pub fn output(&self) -> ToolOutput {
        ToolOutput {
            success: self.success,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionLogEntry {
    pub name: String,
    pub args: Value,
    pub result: String,
    pub success: bool,
    pub duration_ms: u64,
    pub retry_attempts: u32,
}

pub type ToolFilter = Arc<dyn Fn(&ToolDefinition) -> bool + Send + Sync>;

enum AttemptFailure {
    Raised(String),
    Invalid(String),
}

impl AttemptFailure {
    fn message(&self) -> String {
        match self {
            AttemptFailure::Raised(message) => message.clone(),
            AttemptFailure::Invalid(message) => format!("Output validation failed: {message}"),
        }
    }

    fn exhausted(&self, tool: &str, attempts: u32) -> String {
        let label = attempts_label(attempts);
        match self {
            AttemptFailure::Raised(message) => {
                format!("Tool '{tool}' failed after {label}: {message}")
            }
            AttemptFailure::Invalid(message) => {
                format!("Output validation failed: {message} (after {label})")
            }
        }
    }
}

/// Runs registered tools behind one calling convention: gating, context
/// injection, bounded retry, output validation and telemetry.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    context: ExecutionContext,
    disabled: HashSet<String>,
    filter: Option<ToolFilter>,
    exclude_delegation: bool,
    observers: Vec<Arc<dyn ToolEventObserver>>,
    log: Option<Mutex<VecDeque<ExecutionLogEntry>>>,
    log_capacity: usize,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, context: ExecutionContext) -> Self {
        Self {
            registry,
            context,
            disabled: HashSet::new(),
            filter: None,
            exclude_delegation: false,
            observers: Vec::new(),
            log: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Executor for a collaboration session: delegation tools are hidden so
    /// the session cannot hand work off again.
    pub fn for_collaboration(registry: Arc<ToolRegistry>, context: ExecutionContext) -> Self {
        let mut executor = Self::new(registry, context);
        executor.exclude_delegation = true;
        executor
    }

    pub fn with_disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled
            .extend(names.into_iter().map(|name| name.as_ref().to_lowercase()));
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ToolDefinition) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log = enabled.then(|| Mutex::new(VecDeque::new()));
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ToolEventObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Definitions visible through this executor, sorted by name.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        self.registry
            .definitions()
            .into_iter()
            .filter(|definition| self.gate(definition).is_none())
            .collect()
    }

    pub fn execution_log(&self) -> Vec<ExecutionLogEntry> {
        match &self.log {
            Some(log) => log
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn clear_execution_log(&self) {
        if let Some(log) = &self.log {
            log.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    /// Narrowed view of [`ToolExecutor::execute`] without bookkeeping.
    pub async fn execute_simple(&self, name: &str, arguments: Value) -> ToolOutput {
        self.execute(name, arguments).await.output()
    }

    pub async fn execute(&self, name: &str, arguments: Value) -> ToolExecutionResult {
        let started = Instant::now();
        let tool = match self.resolve(name) {
            Ok(tool) => tool,
            Err(message) => {
                warn!(tool = %name, %message, "Tool lookup failed");
                self.emit(ToolEvent::Error {
                    tool: name.to_string(),
                    phase: ErrorPhase::Lookup,
                    message: message.clone(),
                    attempt: 0,
                });
                return ToolExecutionResult {
                    success: false,
                    content: message,
                    tool_name: name.to_string(),
                    args: arguments,
                    duration_ms: elapsed_ms(started),
                    retry_attempts: 0,
                };
            }
        };

        let definition = &tool.definition;
        let tool_name = definition.name.clone();
        let budget = definition.retry_budget();
        let base_args = self.inject_context(arguments);
        self.emit(ToolEvent::Start {
            tool: tool_name.clone(),
            arguments: base_args.clone(),
        });

        let span = info_span!("tool", tool = %tool_name);
        let mut attempt: u32 = 0;
        let mut previous_error: Option<String> = None;
        let mut call_args;
        let output = loop {
            attempt += 1;
            call_args = base_args.clone();
            if let Some(previous) = &previous_error {
                if let Some(map) = call_args.as_object_mut() {
                    map.insert(RETRY_ATTEMPT_KEY.to_string(), Value::from(attempt - 1));
                    map.insert(PREVIOUS_ERROR_KEY.to_string(), Value::from(previous.as_str()));
                }
            }

            debug!(tool = %tool_name, attempt, budget, "Invoking tool");
            let failure = match tool.invoke(call_args.clone()).instrument(span.clone()).await {
                Ok(output) if !output.success => break output,
                Ok(output) => match validate_output(definition, &output) {
                    Ok(()) => break output,
                    Err(message) => AttemptFailure::Invalid(message),
                },
                Err(err) => AttemptFailure::Raised(err.to_string()),
            };

            let message = failure.message();
            self.emit(ToolEvent::Error {
                tool: tool_name.clone(),
                phase: ErrorPhase::Execution,
                message: message.clone(),
                attempt,
            });
            if attempt > budget {
                warn!(tool = %tool_name, attempts = attempt, error = %message, "Tool retries exhausted");
                break ToolOutput::failed(failure.exhausted(&tool_name, attempt));
            }
            warn!(tool = %tool_name, attempt, budget, error = %message, "Tool attempt failed, retrying");
            previous_error = Some(message);
        };

        let result = ToolExecutionResult {
            success: output.success,
            content: output.content,
            tool_name,
            args: call_args,
            duration_ms: elapsed_ms(started),
            retry_attempts: attempt - 1,
        };
        info!(
            tool = %result.tool_name,
            success = result.success,
            duration_ms = result.duration_ms,
            retry_attempts = result.retry_attempts,
            "Tool executed"
        );
        self.emit(ToolEvent::End {
            tool: result.tool_name.clone(),
            success: result.success,
            content: result.content.clone(),
            duration_ms: result.duration_ms,
            retry_attempts: result.retry_attempts,
        });
        self.record(&result);
        result
    }

    fn resolve(&self, name: &str) -> Result<Arc<Tool>, String> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| format!("Tool '{name}' not found"))?;
        match self.gate(&tool.definition) {
            Some(message) => Err(message),
            None => Ok(tool),
        }
    }

    fn gate(&self, definition: &ToolDefinition) -> Option<String> {
        let name = &definition.name;
        if self.disabled.contains(&name.to_lowercase()) {
            return Some(format!("Tool '{name}' is disabled"));
        }
        if self.exclude_delegation && definition.delegates {
            return Some(format!("Tool '{name}' is not available in this session"));
        }
        if let Some(filter) = &self.filter {
            if !filter(definition) {
                return Some(format!("Tool '{name}' is not available in this session"));
            }
        }
        None
    }

    fn inject_context(&self, arguments: Value) -> Value {
        let mut map = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("input".to_string(), other);
                map
            }
        };
        if let Some(bot_id) = &self.context.bot_id {
            map.insert(BOT_ID_KEY.to_string(), Value::from(bot_id.as_str()));
        }
        if let Some(chat_id) = &self.context.chat_id {
            map.insert(CHAT_ID_KEY.to_string(), Value::from(chat_id.as_str()));
        }
        Value::Object(map)
    }

    fn emit(&self, event: ToolEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn record(&self, result: &ToolExecutionResult) {
        let Some(log) = &self.log else {
            return;
        };
        let mut log = log.lock().unwrap_or_else(|e| e.into_inner());
        log.push_back(ExecutionLogEntry {
            name: result.tool_name.clone(),
            args: result.args.clone(),
            result: truncate(&result.content, LOG_RESULT_LIMIT),
            success: result.success,
            duration_ms: result.duration_ms,
            retry_attempts: result.retry_attempts,
        });
        while log.len() > self.log_capacity {
            log.pop_front();
        }
    }
}

#[async_trait]
impl ToolDispatch for ToolExecutor {
    async fn dispatch(&self, name: &str, arguments: Value) -> ToolOutput {
        self.execute_simple(name, arguments).await
    }
}

fn validate_output(definition: &ToolDefinition, output: &ToolOutput) -> Result<(), String> {
    let Some(validator) = &definition.output_schema else {
        return Ok(());
    };
    let parsed: Value = serde_json::from_str(&output.content)
        .map_err(|err| format!("output is not valid JSON: {err}"))?;
    validator.validate(&parsed)
}

fn attempts_label(attempts: u32) -> String {
    if attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{attempts} attempts")
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
