//! Built-in processors over [`Input`]
//!
//! These are the processors a pipeline definition file can name. Each one
//! either resolves the run or hands the input on unchanged.

use anyhow::anyhow;
use serde_json::Value;
use thiserror::Error;

use crate::error::Fault;
use crate::flow::{Next, Processor};
use crate::input::Input;

/// Raised by [`RequireProcessor`] when its key is absent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("required input key '{key}' is missing")]
pub struct MissingKey {
    /// The absent key
    pub key: String,
}

/// Resolves with a fixed result when an input key matches
///
/// Without `equals`, the key only has to be present.
#[derive(Debug, Clone)]
pub struct MatchProcessor {
    key: String,
    equals: Option<Value>,
    result: Value,
}

impl MatchProcessor {
    /// Resolve with `result` when `key` equals `equals`
    #[must_use]
    pub fn new(key: &str, equals: Option<Value>, result: Value) -> Self {
        Self {
            key: key.to_string(),
            equals,
            result,
        }
    }

    fn matches(&self, input: &Input) -> bool {
        match (input.get(&self.key), &self.equals) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl Processor<Input, Value> for MatchProcessor {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        if self.matches(input) {
            return Ok(self.result.clone());
        }
        next.run(input)
    }

    fn name(&self) -> &str {
        "match"
    }
}

/// Writes a value into the input, then delegates
#[derive(Debug, Clone)]
pub struct SetProcessor {
    key: String,
    value: Value,
}

impl SetProcessor {
    /// Write `value` under `key`
    #[must_use]
    pub fn new(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }
}

impl Processor<Input, Value> for SetProcessor {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        input.set(self.key.clone(), self.value.clone());
        next.run(input)
    }

    fn name(&self) -> &str {
        "set"
    }
}

/// Faults with [`MissingKey`] unless the key is present
#[derive(Debug, Clone)]
pub struct RequireProcessor {
    key: String,
}

impl RequireProcessor {
    /// Require `key`
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl Processor<Input, Value> for RequireProcessor {
    fn process(&self, input: &mut Input, next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        if !input.has(&self.key) {
            return Err(MissingKey {
                key: self.key.clone(),
            }
            .into());
        }
        next.run(input)
    }

    fn name(&self) -> &str {
        "require"
    }
}

/// Always faults with a fixed message
#[derive(Debug, Clone)]
pub struct FailProcessor {
    message: String,
}

impl FailProcessor {
    /// Fault with `message`
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Processor<Input, Value> for FailProcessor {
    fn process(&self, _input: &mut Input, _next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        Err(anyhow!("{}", self.message))
    }

    fn name(&self) -> &str {
        "fail"
    }
}

/// Resolves with the whole input as a JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProcessor;

impl Processor<Input, Value> for EchoProcessor {
    fn process(&self, input: &mut Input, _next: Next<'_, Input, Value>) -> Result<Value, Fault> {
        Ok(input.clone().into_value())
    }

    fn name(&self) -> &str {
        "echo"
    }
}
