//! # Agent Module
//!
//! Bounded tool-calling exchange with a chat backend, plus the loop detector
//! that guards it.
//!
//! ## Key Types
//!
//! - [`Runner`] - drives rounds against a [`ChatBackend`](crate::model::ChatBackend)
//! - [`RunnerOptions`] - round budget, tool catalog and loop guard
//! - [`RunOutcome`] - final text, executed steps and transcript
//! - [`LoopDetector`] - repeat / no-progress / volume heuristics
//! - [`AgentError`] - errors that can occur during a run
//!
//! ## Runner Loop
//!
//! 1. Send the transcript to the backend
//! 2. Tool calls requested: run them in order, append results, next round
//! 3. Plain text: return it
//! 4. Final round: tools withheld, a summary is requested; empty text yields
//!    [`FALLBACK_RESPONSE`]

mod errors;
mod instructions;
mod loop_detector;
mod models;
mod runner;


pub use errors::AgentError;
pub use instructions::FALLBACK_RESPONSE;
pub use loop_detector::{LoopAction, LoopDetector, LoopVerdict, OUTCOME_PREFIX_CHARS};
pub use models::{AgentStep, DEFAULT_MAX_ROUNDS, RunOutcome, RunnerOptions};
pub use runner::Runner;
