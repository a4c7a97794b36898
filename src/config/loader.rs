//! Configuration group loaders
//!
//! Loaders are processors over an [`Input`] carrying the requested group
//! name under `group`. A loader that finds the group resolves the run with
//! its contents and records where they came from under `source`; otherwise
//! it delegates to the next loader.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde_json::{Number, Value};

use crate::error::Fault;
use crate::flow::{Blocker, Next, Processor};
use crate::input::Input;

/// Input key holding the requested group name
pub const GROUP_KEY: &str = "group";

/// Input key a loader sets to the path it loaded from
pub const SOURCE_KEY: &str = "source";

/// Input key set by [`GroupBlocker`] when no loader found the group
pub const MISSED_KEY: &str = "missed";

/// File formats a [`DirectoryLoader`] understands, in lookup order
const EXTENSIONS: &[&str] = &["toml", "json"];

/// Loads `<dir>/<group>.toml` or `<dir>/<group>.json`
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    /// Load groups from `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The directory groups are loaded from
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn find(&self, group: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{group}.{ext}")))
            .find(|path| path.is_file())
    }
}

/// Parse a group file, choosing the format by extension
pub fn parse_group_file(path: &Path) -> Result<Value, Fault> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config group: {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str::<toml::Value>(&content)
            .map(toml_to_json)
            .with_context(|| format!("Failed to parse TOML config group: {}", path.display())),
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config group: {}", path.display())),
        _ => Err(anyhow!("Unsupported config group format: {}", path.display())),
    }
}

/// Convert a TOML value to JSON, rendering datetimes as RFC 3339 strings
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

impl Processor<Input, Value> for DirectoryLoader {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        let group = input
            .get_str(GROUP_KEY)
            .ok_or_else(|| anyhow!("config loader input has no '{GROUP_KEY}'"))?
            .to_string();

        match self.find(&group) {
            Some(path) => {
                let value = parse_group_file(&path)?;
                input.set(SOURCE_KEY, path.display().to_string());
                Ok(value)
            }
            None => next.run(input),
        }
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Terminal blocker of a loader chain
///
/// A group no loader knows about is marked as missed on the input rather
/// than treated as an error; faults are re-raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupBlocker;

impl Blocker<Input, Value> for GroupBlocker {
    fn missed(&self, input: &mut Input) -> Result<Value, Fault> {
        input.set(MISSED_KEY, true);
        Ok(Value::Null)
    }

    fn error(&self, _input: &mut Input, fault: Fault) -> Result<Value, Fault> {
        Err(fault)
    }
}
