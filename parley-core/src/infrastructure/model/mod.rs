//! Chat backend abstraction
//!
//! The runner talks to language models only through [`ChatBackend`]. Concrete
//! HTTP clients live outside this crate.
//!
//! # Structure
//! - `types` - Options, reply, schema and error types
//! - `traits` - ChatBackend trait

pub mod traits;
pub mod types;

pub use traits::ChatBackend;
pub use types::{ChatOptions, ChatReply, ModelError, ToolSchema};
