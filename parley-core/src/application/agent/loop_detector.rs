//! Heuristic guard against agents that repeat themselves.
//!
//! Complements the runner's hard round cap: a call repeated with identical
//! arguments, or a tool that keeps producing the same output despite varied
//! arguments, is flagged before the round budget runs out.

use serde_json::Value;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use tracing::debug;

/// Characters of a tool result considered for the outcome signature.
pub const OUTCOME_PREFIX_CHARS: usize = 500;

const REPEAT_WARN: u32 = 3;
const REPEAT_BREAK: u32 = 4;
const NO_PROGRESS_WARN: u32 = 2;
const NO_PROGRESS_BREAK: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Warn,
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVerdict {
    pub action: LoopAction,
    pub reason: String,
}

impl LoopVerdict {
    fn new(action: LoopAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

/// Per-run counter state. Never share one instance between sessions.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    global_limit: usize,
    total_calls: usize,
    calls: HashMap<u64, Signature>,
    outcomes: HashMap<u64, Signature>,
}

#[derive(Debug, Clone)]
struct Signature {
    tool: String,
    count: u32,
}

impl LoopDetector {
    pub fn new(round_budget: usize) -> Self {
        Self {
            global_limit: round_budget.saturating_mul(2).max(1),
            total_calls: 0,
            calls: HashMap::new(),
            outcomes: HashMap::new(),
        }
    }

    pub fn global_limit(&self) -> usize {
        self.global_limit
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls
    }

    pub fn record_call(&mut self, name: &str, args: &Value, result: &str) {
        self.total_calls += 1;

        let serialized = serde_json::to_string(args).unwrap_or_default();
        bump(&mut self.calls, name, signature(name, &serialized));

        let prefix: String = result.chars().take(OUTCOME_PREFIX_CHARS).collect();
        bump(&mut self.outcomes, name, signature(name, &prefix));
    }

    pub fn check(&self) -> LoopVerdict {
        if self.total_calls >= self.global_limit {
            debug!(total = self.total_calls, limit = self.global_limit, "Loop circuit breaker tripped");
            return LoopVerdict::new(
                LoopAction::Break,
                format!(
                    "made {} tool calls, reaching the limit of {}",
                    self.total_calls, self.global_limit
                ),
            );
        }

        if let Some(worst) = most_repeated(&self.calls) {
            if worst.count >= REPEAT_BREAK {
                return LoopVerdict::new(
                    LoopAction::Break,
                    format!(
                        "called '{}' {} times with identical arguments",
                        worst.tool, worst.count
                    ),
                );
            }
            if worst.count >= REPEAT_WARN {
                return LoopVerdict::new(
                    LoopAction::Warn,
                    format!(
                        "called '{}' {} times with identical arguments",
                        worst.tool, worst.count
                    ),
                );
            }
        }

        if let Some(worst) = most_repeated(&self.outcomes) {
            if worst.count >= NO_PROGRESS_BREAK {
                return LoopVerdict::new(
                    LoopAction::Break,
                    format!(
                        "'{}' returned the same result {} times without progress",
                        worst.tool, worst.count
                    ),
                );
            }
            if worst.count >= NO_PROGRESS_WARN {
                return LoopVerdict::new(
                    LoopAction::Warn,
                    format!(
                        "'{}' returned the same result {} times without progress",
                        worst.tool, worst.count
                    ),
                );
            }
        }

        LoopVerdict::new(LoopAction::Continue, "no loop detected")
    }

    pub fn reset(&mut self) {
        self.total_calls = 0;
        self.calls.clear();
        self.outcomes.clear();
    }
}

fn signature(name: &str, payload: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    payload.hash(&mut hasher);
    hasher.finish()
}

fn bump(counts: &mut HashMap<u64, Signature>, tool: &str, key: u64) {
    counts
        .entry(key)
        .or_insert_with(|| Signature {
            tool: tool.to_string(),
            count: 0,
        })
        .count += 1;
}

fn most_repeated(counts: &HashMap<u64, Signature>) -> Option<&Signature> {
    counts.values().max_by_key(|signature| signature.count)
}
