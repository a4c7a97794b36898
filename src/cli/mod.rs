//! CLI output formatting
//!
//! Provides human-readable terminal display for pipeline runs, pipeline
//! listings and check reports.

pub mod display;

pub use display::render_diagnostic_report;
pub use display::render_pipeline_list;
pub use display::RunDisplay;
