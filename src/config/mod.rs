//! Configuration
//!
//! Two concerns live here: the pipeline definition file the CLI runs
//! pipelines from, and the configuration repository that loads groups of
//! application settings through a flow of loaders.

pub mod loader;
pub mod pipelines;
pub mod registry;
pub mod repository;

pub use loader::{DirectoryLoader, GroupBlocker};
pub use pipelines::{BlockerConfig, GlobalConfig, PipelineConfig, PipelineFile, ProcessorConfig};
pub use registry::build_flow;
pub use repository::{ConfigEvent, Repository};
