//! Pipeline definition file parser
//!
//! Parses `blockflow.toml` into structured pipeline definitions. Structural
//! problems (duplicate or empty names) are rejected here; blocker and
//! processor kinds are resolved later by [`build_flow`](super::registry::build_flow).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::Completion;
use crate::log::Level;

/// Global configuration shared across all pipelines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Directory for run and handler logs (default: `.blockflow`)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Minimum level of records passed to log handlers (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: Level,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".blockflow")
}

const fn default_log_level() -> Level {
    Level::Info
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Blocker definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockerConfig {
    /// Blocker kind: `exception`, `fallback` or `missed`
    pub kind: String,
    /// Value returned by `fallback` and `missed` blockers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Default for BlockerConfig {
    fn default() -> Self {
        Self {
            kind: "exception".to_string(),
            value: None,
        }
    }
}

/// Processor definition
///
/// Which of the optional fields are required depends on `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Processor kind: `match`, `set`, `require`, `fail` or `echo`
    pub kind: String,
    /// Input key the processor looks at or writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value the input key must equal for `match`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    /// Value `match` resolves with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Value `set` writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Message `fail` raises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A single pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Unique name for this pipeline
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether resolved values pass through the blocker
    #[serde(default)]
    pub completion: Completion,
    /// Terminal blocker (default: exception)
    #[serde(default)]
    pub blocker: BlockerConfig,
    /// Processors in execution order
    #[serde(default, rename = "processor")]
    pub processors: Vec<ProcessorConfig>,
}

/// Top-level configuration parsed from blockflow.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineFile {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Pipeline definitions
    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineConfig>,
}

impl PipelineFile {
    /// Parse a blockflow.toml file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse blockflow.toml content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse blockflow.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Find a pipeline by name
    #[must_use]
    pub fn get_pipeline(&self, name: &str) -> Option<&PipelineConfig> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Comma-separated pipeline names, for error messages
    #[must_use]
    pub fn pipeline_names(&self) -> String {
        self.pipelines
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn validate(&self) -> Result<()> {
        for pipeline in &self.pipelines {
            if pipeline.name.trim().is_empty() {
                bail!("Pipeline name cannot be empty");
            }
        }

        let mut seen = HashSet::new();
        for pipeline in &self.pipelines {
            if !seen.insert(&pipeline.name) {
                bail!("Duplicate pipeline name: '{}'", pipeline.name);
            }
        }

        for pipeline in &self.pipelines {
            for (position, processor) in pipeline.processors.iter().enumerate() {
                if processor.kind.trim().is_empty() {
                    bail!(
                        "Processor {} in pipeline '{}' has an empty kind",
                        position + 1,
                        pipeline.name
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_CONFIG: &str = r#"
[global]
log_dir = "logs"
log_level = "warning"

[[pipeline]]
name = "lookup"
description = "Resolve a key to a number"
blocker = { kind = "fallback", value = "none" }

[[pipeline.processor]]
kind = "match"
key = "key"
equals = "a"
result = 1

[[pipeline.processor]]
kind = "match"
key = "key"
equals = "b"
result = 2

[[pipeline]]
name = "guarded"
completion = "blocker"

[[pipeline.processor]]
kind = "require"
key = "user"
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = PipelineFile::parse(VALID_CONFIG).unwrap();

        assert_eq!(config.global.log_dir, PathBuf::from("logs"));
        assert_eq!(config.global.log_level, Level::Warning);
        assert_eq!(config.pipelines.len(), 2);
    }

    #[test]
    fn test_parse_pipeline_fields() {
        let config = PipelineFile::parse(VALID_CONFIG).unwrap();
        let lookup = config.get_pipeline("lookup").unwrap();

        assert_eq!(lookup.description, "Resolve a key to a number");
        assert_eq!(lookup.completion, Completion::Passthrough);
        assert_eq!(lookup.blocker.kind, "fallback");
        assert_eq!(lookup.blocker.value, Some(json!("none")));
        assert_eq!(lookup.processors.len(), 2);
        assert_eq!(lookup.processors[1].equals, Some(json!("b")));
        assert_eq!(lookup.processors[1].result, Some(json!(2)));
    }

    #[test]
    fn test_defaults() {
        let config = PipelineFile::parse(VALID_CONFIG).unwrap();
        let guarded = config.get_pipeline("guarded").unwrap();

        assert_eq!(guarded.blocker, BlockerConfig::default());
        assert_eq!(guarded.completion, Completion::Blocker);
        assert!(guarded.description.is_empty());
    }

    #[test]
    fn test_missing_global_uses_defaults() {
        let config = PipelineFile::parse(
            r#"
[[pipeline]]
name = "empty"
"#,
        )
        .unwrap();

        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.get_pipeline("empty").unwrap().processors.is_empty());
    }

    #[test]
    fn test_empty_file_has_no_pipelines() {
        let config = PipelineFile::parse("").unwrap();
        assert!(config.pipelines.is_empty());
        assert_eq!(config.pipeline_names(), "");
    }

    #[test]
    fn test_get_pipeline_not_found() {
        let config = PipelineFile::parse(VALID_CONFIG).unwrap();
        assert!(config.get_pipeline("nonexistent").is_none());
    }

    #[test]
    fn test_pipeline_names() {
        let config = PipelineFile::parse(VALID_CONFIG).unwrap();
        assert_eq!(config.pipeline_names(), "lookup, guarded");
    }

    #[test]
    fn test_reject_duplicate_pipeline_names() {
        let toml = r#"
[[pipeline]]
name = "lookup"

[[pipeline]]
name = "lookup"
"#;
        let err = PipelineFile::parse(toml).unwrap_err();
        assert!(err.to_string().contains("Duplicate pipeline name"), "{err}");
    }

    #[test]
    fn test_reject_empty_pipeline_name() {
        let toml = r#"
[[pipeline]]
name = "  "
"#;
        let err = PipelineFile::parse(toml).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"), "{err}");
    }

    #[test]
    fn test_reject_empty_processor_kind() {
        let toml = r#"
[[pipeline]]
name = "lookup"

[[pipeline.processor]]
kind = ""
"#;
        let err = PipelineFile::parse(toml).unwrap_err();
        assert!(err.to_string().contains("empty kind"), "{err}");
    }

    #[test]
    fn test_reject_unknown_log_level() {
        let toml = r#"
[global]
log_level = "loud"
"#;
        assert!(PipelineFile::parse(toml).is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = PipelineFile::from_path("/nonexistent/blockflow.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"), "{err}");
    }
}
