//! Builds flows from pipeline definitions
//!
//! Blocker and processor kinds are resolved by name here. Unknown kinds and
//! missing parameters fail with [`FlowError::InvalidConfiguration`].

use std::sync::Arc;

use serde_json::Value;

use super::pipelines::{BlockerConfig, PipelineConfig, ProcessorConfig};
use crate::error::FlowError;
use crate::flow::{
    Blocker, BlockerCall, CallableBlocker, End, ExceptionBlocker, FallbackBlocker, Flow,
    ProcessorRef,
};
use crate::input::Input;
use crate::processors::{
    EchoProcessor, FailProcessor, MatchProcessor, RequireProcessor, SetProcessor,
};

/// Blocker kinds accepted in definition files
pub const BLOCKER_KINDS: &[&str] = &["exception", "fallback", "missed"];

/// Processor kinds accepted in definition files
pub const PROCESSOR_KINDS: &[&str] = &["match", "set", "require", "fail", "echo"];

/// Processor kinds that resolve or fault without ever delegating
pub const TERMINAL_KINDS: &[&str] = &["fail", "echo"];

fn invalid(message: String) -> FlowError {
    FlowError::InvalidConfiguration(message)
}

fn required<'a, T>(field: Option<&'a T>, kind: &str, name: &str) -> Result<&'a T, FlowError> {
    field.ok_or_else(|| invalid(format!("{kind} requires '{name}'")))
}

/// Build the blocker a definition names
pub fn build_blocker(config: &BlockerConfig) -> Result<Arc<dyn Blocker<Input, Value>>, FlowError> {
    match config.kind.as_str() {
        "exception" => Ok(Arc::new(ExceptionBlocker)),
        "fallback" => {
            let value = required(config.value.as_ref(), "fallback blocker", "value")?;
            Ok(Arc::new(FallbackBlocker::new(value.clone())))
        }
        "missed" => {
            let value = required(config.value.as_ref(), "missed blocker", "value")?.clone();
            Ok(Arc::new(CallableBlocker::new(
                move |_: &mut Input, call: BlockerCall<Value>| match call {
                    BlockerCall::Missed => Ok(value.clone()),
                    BlockerCall::Completed(result) => Ok(result),
                    BlockerCall::Faulted(fault) => Err(fault),
                },
            )))
        }
        other => Err(invalid(format!(
            "unknown blocker kind '{other}' (expected one of: {})",
            BLOCKER_KINDS.join(", ")
        ))),
    }
}

/// Build the processor a definition names
pub fn build_processor(config: &ProcessorConfig) -> Result<ProcessorRef<Input, Value>, FlowError> {
    let kind = config.kind.as_str();
    match kind {
        "match" => {
            let key = required(config.key.as_ref(), "match processor", "key")?;
            let result = required(config.result.as_ref(), "match processor", "result")?;
            Ok(Arc::new(MatchProcessor::new(
                key,
                config.equals.clone(),
                result.clone(),
            )))
        }
        "set" => {
            let key = required(config.key.as_ref(), "set processor", "key")?;
            let value = required(config.value.as_ref(), "set processor", "value")?;
            Ok(Arc::new(SetProcessor::new(key, value.clone())))
        }
        "require" => {
            let key = required(config.key.as_ref(), "require processor", "key")?;
            Ok(Arc::new(RequireProcessor::new(key)))
        }
        "fail" => {
            let message = required(config.message.as_ref(), "fail processor", "message")?;
            Ok(Arc::new(FailProcessor::new(message)))
        }
        "echo" => Ok(Arc::new(EchoProcessor)),
        other => Err(invalid(format!(
            "unknown processor kind '{other}' (expected one of: {})",
            PROCESSOR_KINDS.join(", ")
        ))),
    }
}

/// Build a flow from a pipeline definition
pub fn build_flow(config: &PipelineConfig) -> Result<Flow, FlowError> {
    let in_pipeline =
        |err: FlowError| invalid(format!("in pipeline '{}': {}", config.name, reason(&err)));

    let blocker = build_blocker(&config.blocker).map_err(in_pipeline)?;
    let mut flow = Flow::with_shared_blocker(blocker).with_completion(config.completion);
    for processor in &config.processors {
        flow.append_shared(build_processor(processor).map_err(in_pipeline)?, End::Back);
    }
    Ok(flow)
}

fn reason(err: &FlowError) -> String {
    match err {
        FlowError::InvalidConfiguration(reason) => reason.clone(),
        other => other.to_string(),
    }
}
