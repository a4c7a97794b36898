//! JSONL (JSON Lines) logging
//!
//! Append-only logging of serializable records, one JSON object per line.
//! Used for the run log (`runs.jsonl`) and by the JSONL log handler.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::flow::Resolution;

/// Represents the outcome of a single pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    /// The name of the pipeline that was run
    pub pipeline: String,
    /// ISO 8601 timestamp of when the run finished
    pub timestamp: DateTime<Utc>,
    /// How the run settled
    pub resolution: Resolution,
    /// Number of processors in the pipeline
    pub processors: usize,
    /// Number of processors that were entered
    pub steps: usize,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// The result value, absent when the run faulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The propagated error, present when the run faulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only JSON Lines file of records of type `T`
pub struct JsonlWriter<T> {
    log_path: PathBuf,
    record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlWriter<T> {
    /// Create a new JSONL writer
    ///
    /// # Arguments
    /// * `log_dir` - Directory where the file will be stored (typically `.blockflow`)
    /// * `file_name` - Name of the file inside `log_dir`
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created
    pub fn new<P: AsRef<Path>>(log_dir: P, file_name: &str) -> Result<Self> {
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        Ok(Self {
            log_path: log_dir.join(file_name),
            record: PhantomData,
        })
    }

    /// Append a record to the log
    ///
    /// # Errors
    /// Returns an error if:
    /// - The log file cannot be opened or created
    /// - The record cannot be serialized to JSON
    /// - Writing to the file fails
    pub fn append(&self, record: &T) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open log file: {}", self.log_path.display()))?;

        let json = serde_json::to_string(record).context("Failed to serialize record to JSON")?;

        writeln!(file, "{json}").context("Failed to write to log file")?;

        Ok(())
    }

    /// Read all records from the log, in the order they were written
    ///
    /// # Errors
    /// Returns an error if:
    /// - The log file cannot be read
    /// - Any line cannot be parsed as valid JSON
    pub fn read_all(&self) -> Result<Vec<T>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.log_path)
            .with_context(|| format!("Failed to read log file: {}", self.log_path.display()))?;

        let mut records = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record: T = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse line {} as JSON", line_num + 1))?;

            records.push(record);
        }

        Ok(records)
    }

    /// Get the path to the log file
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
