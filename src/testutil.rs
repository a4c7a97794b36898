//! Shared test utilities
//!
//! Common processors and blockers used across test modules. Only compiled in
//! test builds.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use thiserror::Error;

use crate::error::Fault;
use crate::flow::{Blocker, Next, Processor};
use crate::input::Input;

/// Appends its tag to the `trace` array of the input, then delegates.
pub struct Tagged {
    tag: String,
}

impl Tagged {
    /// Create a processor tagging runs with `tag`.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

impl Processor<Input, Value> for Tagged {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        let mut trace = input
            .get("trace")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        trace.push(json!(self.tag));
        input.set("trace", trace);
        next.run(input)
    }

    fn name(&self) -> &str {
        &self.tag
    }
}

/// Resolves with `result` when the input's `key` equals `expected`.
pub struct Matcher {
    expected: String,
    result: Value,
}

impl Matcher {
    /// Create a matcher for `key == expected`.
    #[must_use]
    pub fn new(expected: &str, result: Value) -> Self {
        Self {
            expected: expected.to_string(),
            result,
        }
    }
}

impl Processor<Input, Value> for Matcher {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        if input.get_str("key") == Some(self.expected.as_str()) {
            return Ok(self.result.clone());
        }
        next.run(input)
    }
}

/// Error raised by failing test processors, identified by `id`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("boom #{id}")]
pub struct Boom {
    /// Identifies the raising site
    pub id: u32,
}

impl Boom {
    /// Create a `Boom` with the given id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self { id }
    }
}

/// What a [`RecordingBlocker`] has seen.
#[derive(Debug, Default)]
pub struct BlockerCalls {
    /// Number of missed calls
    pub missed: usize,
    /// Number of complete calls
    pub complete: usize,
    /// Messages of every fault received
    pub errors: Vec<String>,
    /// Input seen by the most recent call
    pub last_input: Option<Input>,
}

/// Blocker recording its calls and recovering with a fixed value.
pub struct RecordingBlocker {
    value: Value,
    calls: Arc<Mutex<BlockerCalls>>,
}

impl RecordingBlocker {
    /// Create a blocker that returns `value` for missed and error cases.
    #[must_use]
    pub fn returning(value: Value) -> Self {
        Self {
            value,
            calls: Arc::default(),
        }
    }

    /// Handle to the recorded calls, usable after the blocker is moved into a flow.
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<BlockerCalls>> {
        Arc::clone(&self.calls)
    }
}

impl Blocker<Input, Value> for RecordingBlocker {
    fn missed(&self, input: &mut Input) -> Result<Value, Fault> {
        let mut calls = self.calls.lock().unwrap();
        calls.missed += 1;
        calls.last_input = Some(input.clone());
        Ok(self.value.clone())
    }

    fn complete(&self, input: &mut Input, result: Value) -> Result<Value, Fault> {
        let mut calls = self.calls.lock().unwrap();
        calls.complete += 1;
        calls.last_input = Some(input.clone());
        Ok(result)
    }

    fn error(&self, input: &mut Input, fault: Fault) -> Result<Value, Fault> {
        let mut calls = self.calls.lock().unwrap();
        calls.errors.push(fault.to_string());
        calls.last_input = Some(input.clone());
        Ok(self.value.clone())
    }
}
