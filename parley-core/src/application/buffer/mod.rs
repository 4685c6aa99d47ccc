//! # Buffer Module
//!
//! Front door for inbound conversation traffic.
//!
//! ## Key Types
//!
//! - [`MessageBuffer`] - dedup, debounce and per-session serialization
//! - [`InboundMessage`] / [`MergedBatch`] - a single message and a coalesced unit of work
//! - [`ConversationProcessor`] - the embedding application's handler for a batch
//!
//! ## Pipeline
//!
//! 1. Drop repeated (session, message id) pairs
//! 2. Media messages, or a zero debounce window, skip batching
//! 3. Otherwise collect messages until the debounce window closes, then merge
//! 4. Idle session: invoke the processor. Busy session: queue as a followup,
//!    dropping the oldest followup once the queue is full
//! 5. When an invocation settles, the oldest followup runs after the queue
//!    debounce delay
//!
//! Processor errors and panics are logged and never stop a session from draining.

mod inbound;
mod message_buffer;
mod processor;
mod state;


pub use inbound::{InboundMessage, MergedBatch};
pub use message_buffer::{
    BufferSettings, DEFAULT_DEBOUNCE, DEFAULT_DEDUP_CAPACITY, DEFAULT_QUEUE_CAP,
    DEFAULT_QUEUE_DEBOUNCE, Enqueued, MessageBuffer,
};
pub use processor::{ConversationProcessor, ProcessorError};
