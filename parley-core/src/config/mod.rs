pub mod app;
pub mod defaults;
pub mod error;
pub mod loader;

/// Default config file path - can be overridden by the caller
pub const CONFIG_PATH: &str = defaults::DEFAULT_CONFIG_PATH;

pub use app::{AgentConfig, BufferConfig, ExecutorConfig, ParleyConfig};
pub use error::ConfigError;
pub use loader::{DEBOUNCE_ENV, MAX_ROUNDS_ENV};
