//! # Tooling Module
//!
//! Uniform execution of heterogeneous tools.
//!
//! ## Key Types
//!
//! - [`ToolRegistry`] - explicitly owned set of registered tools
//! - [`Tool`] / [`ToolKind`] - a definition plus how it runs (handler or command)
//! - [`ToolExecutor`] - lookup, context injection, retry, validation, telemetry
//! - [`ToolEvent`] / [`ToolEventObserver`] - start, end and error telemetry
//!
//! ## Failure Handling
//!
//! | Condition | Retried? |
//! |-----------|----------|
//! | Unknown, disabled or filtered tool | No |
//! | Raised failure (`Err(ToolFailure)`) | Yes, up to the budget |
//! | Explicit `success: false` | No |
//! | Output validation failure | Yes, up to the budget |

mod command;
mod definition;
mod error;
mod events;
mod executor;
mod interface;
mod registry;


pub use command::CommandTemplate;
pub use definition::{
    OutputValidator, RequiredFields, Tool, ToolDefinition, ToolHandler, ToolKind, ToolOutput,
};
pub use error::{RegistryError, ToolFailure};
pub use events::{ChannelObserver, ErrorPhase, ToolEvent, ToolEventObserver};
pub use executor::{
    BOT_ID_KEY, CHAT_ID_KEY, DEFAULT_LOG_CAPACITY, ExecutionContext, ExecutionLogEntry,
    PREVIOUS_ERROR_KEY, RETRY_ATTEMPT_KEY, ToolExecutionResult, ToolExecutor, ToolFilter,
};
pub use interface::ToolDispatch;
pub use registry::ToolRegistry;
