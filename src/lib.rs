//! Blockflow - pipelines of processors ending in a blocker
//!
//! A [`Flow`] runs an input through an ordered chain of processors. Each
//! processor either produces the result or hands the input to the rest of
//! the chain. A blocker terminates every chain: it decides the result when
//! nobody produced one and what happens to a fault.
//!
//! Around the engine sit a configuration repository that loads settings
//! groups through a chain of loaders, a logger whose handlers form a chain,
//! and the `blockflow` binary that runs pipelines defined in a TOML file.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod input;
pub mod log;
pub mod processors;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use error::{Fault, FlowError};
pub use events::Dispatcher;
pub use flow::{
    Blocker, CallableBlocker, CallableProcessor, Completion, End, ExceptionBlocker,
    FallbackBlocker, Flow, Next, Processor, ProcessorRef, ProcessorStore, Resolution, RunReport,
    SharedFlow,
};
pub use input::Input;
