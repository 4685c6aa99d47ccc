use crate::agent;
use crate::buffer;
use crate::tooling;

pub const DEFAULT_CONFIG_PATH: &str = "config/parley.toml";
pub const DEFAULT_ENV_PATH: &str = "config/.env";
pub const DEFAULT_DEBOUNCE_MS: u64 = buffer::DEFAULT_DEBOUNCE.as_millis() as u64;
pub const DEFAULT_QUEUE_DEBOUNCE_MS: u64 = buffer::DEFAULT_QUEUE_DEBOUNCE.as_millis() as u64;
pub const DEFAULT_QUEUE_CAP: usize = buffer::DEFAULT_QUEUE_CAP;
pub const DEFAULT_DEDUP_CAPACITY: usize = buffer::DEFAULT_DEDUP_CAPACITY;
pub const DEFAULT_MAX_ROUNDS: usize = agent::DEFAULT_MAX_ROUNDS;
pub const DEFAULT_LOG_CAPACITY: usize = tooling::DEFAULT_LOG_CAPACITY;
