//! Log handlers
//!
//! Handlers are processors over a [`LogRecord`] that produce the number of
//! handlers that wrote it. A handler that `bubble`s passes the record on to
//! the next handler after writing; one that does not ends the chain.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use colored::{ColoredString, Colorize};
use tracing::warn;

use super::jsonl::JsonlWriter;
use super::record::{Level, LogRecord};
use crate::error::Fault;
use crate::flow::{Blocker, Next, Processor};

/// Record the handler as having written `record`, then bubble or stop
fn finish(
    name: &str,
    bubble: bool,
    record: &mut LogRecord,
    next: Next<'_, LogRecord, usize>,
) -> Result<usize, Fault> {
    record.handled_by.push(name.to_string());
    if bubble {
        next.run(record)
    } else {
        Ok(record.handled_by.len())
    }
}

/// Stops records below a minimum level from reaching later handlers
#[derive(Debug, Clone, Copy)]
pub struct LevelGate {
    min: Level,
}

impl LevelGate {
    /// Let through records at `min` or above
    #[must_use]
    pub const fn new(min: Level) -> Self {
        Self { min }
    }
}

impl Processor<LogRecord, usize> for LevelGate {
    fn process(
        &self,
        record: &mut LogRecord,
        next: Next<'_, LogRecord, usize>,
    ) -> Result<usize, Fault> {
        if record.level < self.min {
            return Ok(record.handled_by.len());
        }
        next.run(record)
    }

    fn name(&self) -> &str {
        "level-gate"
    }
}

/// Format a record as a single colored line
#[must_use]
pub fn format_line(record: &LogRecord) -> String {
    let level = level_label(record.level);
    let mut line = format!(
        "{} {}.{}: {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        record.channel,
        level,
        record.message
    );
    if !record.context.is_empty() {
        let context = serde_json::to_string(&record.context).unwrap_or_default();
        line.push(' ');
        line.push_str(&context.dimmed().to_string());
    }
    line
}

fn level_label(level: Level) -> ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        Level::Debug => label.dimmed(),
        Level::Info => label.cyan(),
        Level::Warning => label.yellow().bold(),
        Level::Error => label.red().bold(),
    }
}

/// Writes records to stderr
#[derive(Debug, Clone, Copy)]
pub struct StderrHandler {
    min: Level,
    bubble: bool,
}

impl StderrHandler {
    /// Write records at `min` or above
    #[must_use]
    pub const fn new(min: Level, bubble: bool) -> Self {
        Self { min, bubble }
    }
}

impl Processor<LogRecord, usize> for StderrHandler {
    fn process(
        &self,
        record: &mut LogRecord,
        next: Next<'_, LogRecord, usize>,
    ) -> Result<usize, Fault> {
        if record.level < self.min {
            return next.run(record);
        }
        eprintln!("{}", format_line(record));
        finish(self.name(), self.bubble, record, next)
    }

    fn name(&self) -> &str {
        "stderr"
    }
}

/// Appends records to a JSON Lines file
pub struct JsonlHandler {
    writer: JsonlWriter<LogRecord>,
    min: Level,
    bubble: bool,
}

impl JsonlHandler {
    /// Append records at `min` or above to `<log_dir>/<file_name>`
    ///
    /// # Errors
    /// Returns an error if the log directory cannot be created
    pub fn new<P: AsRef<Path>>(log_dir: P, file_name: &str, min: Level, bubble: bool) -> Result<Self> {
        Ok(Self {
            writer: JsonlWriter::new(log_dir, file_name)?,
            min,
            bubble,
        })
    }

    /// The file records are appended to
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.writer.log_path()
    }
}

impl Processor<LogRecord, usize> for JsonlHandler {
    fn process(
        &self,
        record: &mut LogRecord,
        next: Next<'_, LogRecord, usize>,
    ) -> Result<usize, Fault> {
        if record.level < self.min {
            return next.run(record);
        }
        self.writer.append(record)?;
        finish(self.name(), self.bubble, record, next)
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Keeps records in memory
#[derive(Debug, Clone)]
pub struct MemoryHandler {
    records: Arc<Mutex<Vec<LogRecord>>>,
    min: Level,
    bubble: bool,
}

impl MemoryHandler {
    /// Keep records at `min` or above
    #[must_use]
    pub fn new(min: Level, bubble: bool) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            min,
            bubble,
        }
    }

    /// Records kept so far
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Processor<LogRecord, usize> for MemoryHandler {
    fn process(
        &self,
        record: &mut LogRecord,
        next: Next<'_, LogRecord, usize>,
    ) -> Result<usize, Fault> {
        if record.level < self.min {
            return next.run(record);
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        finish(self.name(), self.bubble, record, next)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Terminal blocker of a handler chain
///
/// Logging never fails the caller: a handler fault is reported through
/// `tracing` and the record counts as handled by whoever wrote it already.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBlocker;

impl Blocker<LogRecord, usize> for LogBlocker {
    fn missed(&self, record: &mut LogRecord) -> Result<usize, Fault> {
        Ok(record.handled_by.len())
    }

    fn error(&self, record: &mut LogRecord, fault: Fault) -> Result<usize, Fault> {
        warn!(
            channel = %record.channel,
            error = %format!("{fault:#}"),
            "log handler failed"
        );
        Ok(record.handled_by.len())
    }
}
