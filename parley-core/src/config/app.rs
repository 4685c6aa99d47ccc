use super::defaults::*;
use super::error::ConfigError;
use crate::agent::RunnerOptions;
use crate::buffer::BufferSettings;
use crate::tooling::ToolExecutor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime configuration loaded from parley.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub buffer: BufferConfig,
    pub agent: AgentConfig,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub debounce_ms: u64,
    pub queue_debounce_ms: u64,
    pub queue_cap: usize,
    pub dedup_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            queue_debounce_ms: DEFAULT_QUEUE_DEBOUNCE_MS,
            queue_cap: DEFAULT_QUEUE_CAP,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_rounds: usize,
    pub loop_guard: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            loop_guard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub disabled_tools: Vec<String>,
    pub log_executions: bool,
    pub log_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            disabled_tools: Vec::new(),
            log_executions: false,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl ParleyConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text without touching the environment
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        super::loader::parse_config(content, Path::new("<inline>"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.queue_cap == 0 {
            return Err(ConfigError::MustBePositive {
                field: "buffer.queue_cap",
            });
        }
        if self.agent.max_rounds == 0 {
            return Err(ConfigError::MustBePositive {
                field: "agent.max_rounds",
            });
        }
        Ok(())
    }

    pub fn buffer_settings(&self) -> BufferSettings {
        BufferSettings {
            debounce: Duration::from_millis(self.buffer.debounce_ms),
            queue_debounce: Duration::from_millis(self.buffer.queue_debounce_ms),
            queue_cap: self.buffer.queue_cap,
            dedup_capacity: self.buffer.dedup_capacity,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions::default()
            .with_max_rounds(self.agent.max_rounds)
            .with_loop_guard(self.agent.loop_guard)
    }

    /// Apply the `[executor]` section to an executor under construction
    pub fn configure_executor(&self, executor: ToolExecutor) -> ToolExecutor {
        executor
            .with_disabled(&self.executor.disabled_tools)
            .with_logging(self.executor.log_executions)
            .with_log_capacity(self.executor.log_capacity)
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
