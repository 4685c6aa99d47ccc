pub mod agent;
pub mod buffer;
pub mod tooling;
