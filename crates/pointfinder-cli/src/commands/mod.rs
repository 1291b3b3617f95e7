//! CLI commands

pub mod enqueue;
pub mod listen;
pub mod queue;
pub mod status;
pub mod sync;
