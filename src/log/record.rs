//! Log records and levels

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Diagnostic detail
    Debug,
    /// Normal operation
    Info,
    /// Something unexpected that did not stop the operation
    Warning,
    /// An operation failed
    Error,
}

impl Level {
    /// Lowercase name, as used in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => bail!("Unknown log level '{other}'"),
        }
    }
}

/// A single log entry travelling through a handler chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the record was created
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: Level,
    /// Logger channel the record was emitted on
    pub channel: String,
    /// Human-readable message
    pub message: String,
    /// Structured context
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    /// Handlers that wrote the record so far in this chain
    #[serde(skip)]
    pub handled_by: Vec<String>,
}

impl LogRecord {
    /// Create a record with no context
    #[must_use]
    pub fn new(level: Level, channel: &str, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            channel: channel.to_string(),
            message: message.to_string(),
            context: Map::new(),
            handled_by: Vec::new(),
        }
    }

    /// Add a context entry
    #[must_use]
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}
