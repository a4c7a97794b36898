//! Logging
//!
//! Application logging runs each [`LogRecord`] through a chain of handlers
//! built on [`Flow`](crate::flow::Flow). JSON Lines files keep the run
//! history the CLI appends to after every pipeline run.

pub mod handlers;
pub mod jsonl;
pub mod logger;
pub mod record;
pub mod subscriber;

pub use handlers::{JsonlHandler, LevelGate, LogBlocker, MemoryHandler, StderrHandler};
pub use jsonl::{JsonlWriter, RunRecord};
pub use logger::Logger;
pub use record::{Level, LogRecord};
pub use subscriber::init_tracing;
