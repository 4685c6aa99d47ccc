//! # Parley Core
//!
//! Execution core for multi-session conversational agents:
//!
//! - [`buffer`] - dedup, debounce and per-session serialization of inbound messages
//! - [`tooling`] - uniform tool execution with retry, validation and telemetry
//! - [`agent`] - bounded tool-calling runner and loop detection
//!
//! Concrete tools, chat backends and conversation processors are supplied by
//! the embedding application through the traits exported here.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

pub use application::{agent, buffer, tooling};
pub use config::{ConfigError, ParleyConfig};
pub use domain::types;
pub use infrastructure::model;
