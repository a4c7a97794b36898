//! Flow engine
//!
//! A [`Flow`] owns one blocker and one [`ProcessorStore`]. Starting a flow
//! snapshots the store and runs the input through the processors front to
//! back. The first processor to return a value resolves the run; if all of
//! them delegate, the blocker's missed case decides the result. Faults are
//! caught once at the flow boundary and handed to the blocker.
//!
//! ```
//! use blockflow::{End, Flow, Input};
//! use serde_json::{json, Value};
//!
//! let mut flow: Flow = Flow::default();
//! flow.append_fn(
//!     |input: &mut Input, next| {
//!         if input.get_str("key") == Some("b") {
//!             return Ok(json!(2));
//!         }
//!         next.run(input)
//!     },
//!     End::Back,
//! );
//!
//! let mut input = Input::from([("key", "b")]);
//! assert_eq!(flow.start(&mut input).unwrap(), json!(2));
//! assert_eq!(flow.start(&mut Input::new()).unwrap(), Value::Null);
//! ```

pub mod blocker;
pub mod processor;
pub mod run;
pub mod shared;
pub mod store;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use blocker::{Blocker, BlockerCall, CallableBlocker, ExceptionBlocker, FallbackBlocker};
pub use processor::{CallableProcessor, Next, Processor, ProcessorRef};
pub use run::{Completion, Resolution, RunReport};
pub use shared::SharedFlow;
pub use store::{End, ProcessorStore};

use crate::error::{Fault, FlowError};
use crate::input::Input;

/// A processor chain with a terminal blocker
pub struct Flow<I = Input, O = Value> {
    blocker: Arc<dyn Blocker<I, O>>,
    store: ProcessorStore<I, O>,
    completion: Completion,
}

impl<I, O> Flow<I, O> {
    /// Create a flow settled by `blocker`
    pub fn new<B>(blocker: B) -> Self
    where
        B: Blocker<I, O> + 'static,
    {
        Self::with_shared_blocker(Arc::new(blocker))
    }

    /// Create a flow settled by a function adapted through [`CallableBlocker`]
    pub fn from_fn<F>(blocker: F) -> Self
    where
        F: Fn(&mut I, BlockerCall<O>) -> Result<O, Fault> + Send + Sync + 'static,
    {
        Self::new(CallableBlocker::new(blocker))
    }

    /// Create a flow settled by a blocker that may be shared with other flows
    pub fn with_shared_blocker(blocker: Arc<dyn Blocker<I, O>>) -> Self {
        Self {
            blocker,
            store: ProcessorStore::new(),
            completion: Completion::default(),
        }
    }

    /// Choose whether resolved values pass through the blocker
    #[must_use]
    pub const fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// The completion mode
    #[must_use]
    pub const fn completion(&self) -> Completion {
        self.completion
    }

    /// The blocker settling this flow
    #[must_use]
    pub fn blocker(&self) -> &Arc<dyn Blocker<I, O>> {
        &self.blocker
    }

    /// Insert a processor at the given end, returning the new count
    pub fn append<P>(&mut self, processor: P, at: End) -> usize
    where
        P: Processor<I, O> + 'static,
    {
        self.store.append(processor, at)
    }

    /// Insert a function as a processor, returning the new count
    pub fn append_fn<F>(&mut self, processor: F, at: End) -> usize
    where
        F: Fn(&mut I, Next<'_, I, O>) -> Result<O, Fault> + Send + Sync + 'static,
    {
        self.store.append(CallableProcessor::new(processor), at)
    }

    /// Insert an already shared processor, returning the new count
    pub fn append_shared(&mut self, processor: ProcessorRef<I, O>, at: End) -> usize {
        self.store.append_shared(processor, at)
    }

    /// Remove one processor from the given end
    pub fn remove_one(&mut self, from: End) -> Result<ProcessorRef<I, O>, FlowError> {
        self.store.remove_one(from)
    }

    /// Remove every processor
    pub fn clear(&mut self) -> &mut Self {
        self.store.clear();
        self
    }

    /// Returns true if the flow has no processors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of processors
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Snapshot of the processors in execution order
    #[must_use]
    pub fn to_ordered_list(&self) -> Vec<ProcessorRef<I, O>> {
        self.store.to_ordered_list()
    }

    /// Run `input` through the flow
    ///
    /// # Errors
    /// Returns the fault the blocker re-raised, if any.
    pub fn start(&self, input: &mut I) -> Result<O, Fault> {
        self.run(input).into_result()
    }

    /// Run an empty input through the flow
    pub fn start_empty(&self) -> Result<O, Fault>
    where
        I: Default,
    {
        self.start(&mut I::default())
    }

    /// Run `input` through the flow, reporting how the run settled
    pub fn run(&self, input: &mut I) -> RunReport<O> {
        let snapshot = self.store.to_ordered_list();
        run::execute(&snapshot, self.blocker.as_ref(), self.completion, input)
    }

    /// Convert into a flow whose store can be mutated through a shared reference
    #[must_use]
    pub fn into_shared(self) -> SharedFlow<I, O> {
        SharedFlow::from_parts(self.blocker, self.store, self.completion)
    }
}

impl<I, O: Default> Default for Flow<I, O> {
    fn default() -> Self {
        Self::new(ExceptionBlocker)
    }
}

impl<I, O> fmt::Debug for Flow<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("processors", &self.store)
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::testutil::{Boom, Matcher, RecordingBlocker, Tagged};
    use anyhow::anyhow;
    use serde_json::json;

    #[test]
    fn test_empty_flow_invokes_missed_with_same_input() {
        let blocker = RecordingBlocker::returning(json!("missed"));
        let calls = blocker.calls();
        let flow: Flow = Flow::new(blocker);

        let mut input = Input::from([("key", "value")]);
        let report = flow.run(&mut input);

        assert_eq!(report.result.unwrap(), json!("missed"));
        assert_eq!(report.resolution, Resolution::Missed);
        assert_eq!(report.steps, 0);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.missed, 1);
        assert_eq!(calls.last_input, Some(input.clone()));
    }

    #[test]
    fn test_processors_run_in_append_order() {
        let mut flow: Flow = Flow::default();
        flow.append(Tagged::new("p1"), End::Back);
        flow.append(Tagged::new("p2"), End::Back);
        flow.append(Tagged::new("p3"), End::Back);

        let mut input = Input::new();
        let report = flow.run(&mut input);

        assert_eq!(report.resolution, Resolution::Missed);
        assert_eq!(report.steps, 3);
        assert_eq!(input.get("trace"), Some(&json!(["p1", "p2", "p3"])));
    }

    #[test]
    fn test_front_insertion_runs_first() {
        let mut flow: Flow = Flow::default();
        flow.append(Tagged::new("p1"), End::Back);
        flow.append(Tagged::new("p2"), End::Back);
        flow.append(Tagged::new("p4"), End::Front);

        let mut input = Input::new();
        flow.start(&mut input).unwrap();
        assert_eq!(input.get("trace"), Some(&json!(["p4", "p1", "p2"])));
    }

    #[test]
    fn test_resolving_processor_stops_chain() {
        let mut flow: Flow = Flow::new(RecordingBlocker::returning(json!("missed")));
        flow.append(Matcher::new("a", json!(1)), End::Back);
        flow.append(Matcher::new("b", json!(2)), End::Back);
        flow.append(Tagged::new("after"), End::Back);

        let mut input = Input::from([("key", "b")]);
        let report = flow.run(&mut input);

        assert_eq!(report.result.unwrap(), json!(2));
        assert_eq!(report.resolution, Resolution::Resolved);
        assert_eq!(report.steps, 2);
        assert!(!input.has("trace"));
    }

    #[test]
    fn test_completion_blocker_transforms_resolved_value() {
        let flow_blocker = CallableBlocker::new(|_: &mut Input, call: BlockerCall<Value>| {
            match call {
                BlockerCall::Completed(value) => Ok(json!({ "wrapped": value })),
                BlockerCall::Missed => Ok(json!("missed")),
                BlockerCall::Faulted(fault) => Err(fault),
            }
        });
        let mut flow: Flow = Flow::new(flow_blocker).with_completion(Completion::Blocker);
        flow.append(Matcher::new("a", json!(1)), End::Back);

        assert_eq!(flow.completion(), Completion::Blocker);
        let mut hit = Input::from([("key", "a")]);
        assert_eq!(flow.start(&mut hit).unwrap(), json!({"wrapped": 1}));

        let mut miss = Input::from([("key", "z")]);
        assert_eq!(flow.start(&mut miss).unwrap(), json!("missed"));
    }

    #[test]
    fn test_passthrough_skips_complete() {
        let blocker = RecordingBlocker::returning(json!("missed"));
        let calls = blocker.calls();
        let mut flow: Flow = Flow::new(blocker);
        flow.append(Matcher::new("a", json!(1)), End::Back);

        let mut input = Input::from([("key", "a")]);
        assert_eq!(flow.start(&mut input).unwrap(), json!(1));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.complete, 0);
        assert_eq!(calls.missed, 0);
    }

    #[test]
    fn test_processor_fault_reaches_blocker_once() {
        let blocker = RecordingBlocker::returning(json!("fallback"));
        let calls = blocker.calls();
        let mut flow: Flow = Flow::new(blocker);
        flow.append(Tagged::new("p1"), End::Back);
        flow.append_fn(|_, _| Err(Boom::new(7).into()), End::Back);

        let report = flow.run(&mut Input::new());
        assert_eq!(report.result.unwrap(), json!("fallback"));
        assert_eq!(report.resolution, Resolution::Recovered);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.errors, vec!["boom #7".to_string()]);
        assert_eq!(calls.missed, 0);
    }

    #[test]
    fn test_default_blocker_propagates_exact_fault() {
        let mut flow: Flow = Flow::default();
        flow.append_fn(|_, _| Err(Boom::new(42).into()), End::Back);

        let err = flow.start_empty().unwrap_err();
        assert_eq!(err.downcast_ref::<Boom>(), Some(&Boom::new(42)));
    }

    #[test]
    fn test_fault_in_missed_case_reaches_error_case() {
        let flow: Flow = Flow::from_fn(|_, call| match call {
            BlockerCall::Missed => Err(anyhow!("nothing matched")),
            BlockerCall::Faulted(fault) => Ok(json!(format!("handled: {fault}"))),
            BlockerCall::Completed(value) => Ok(value),
        });

        assert_eq!(
            flow.start_empty().unwrap(),
            json!("handled: nothing matched")
        );
    }

    #[test]
    fn test_fault_in_complete_case_reaches_error_case_once() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&errors);
        let mut flow: Flow = Flow::from_fn(move |_, call| match call {
            BlockerCall::Completed(_) => Err(anyhow!("bad result")),
            BlockerCall::Faulted(fault) => {
                recorded.lock().unwrap().push(fault.to_string());
                Ok(json!(format!("handled: {fault}")))
            }
            BlockerCall::Missed => Ok(Value::Null),
        })
        .with_completion(Completion::Blocker);
        flow.append(Matcher::new("a", json!(1)), End::Back);

        let report = flow.run(&mut Input::from([("key", "a")]));
        assert_eq!(report.resolution, Resolution::Recovered);
        assert_eq!(report.result.unwrap(), json!("handled: bad result"));
        assert_eq!(*errors.lock().unwrap(), vec!["bad result"]);
    }

    #[test]
    fn test_fault_in_error_case_propagates() {
        let flow: Flow = Flow::from_fn(|_, call| match call {
            BlockerCall::Missed => Err(anyhow!("first")),
            BlockerCall::Faulted(_) => Err(anyhow!("second")),
            BlockerCall::Completed(value) => Ok(value),
        });

        let report = flow.run(&mut Input::new());
        assert_eq!(report.resolution, Resolution::Faulted);
        assert_eq!(report.result.unwrap_err().to_string(), "second");
    }

    #[test]
    fn test_processor_mutations_visible_to_blocker() {
        let flow_blocker = CallableBlocker::new(|input: &mut Input, _: BlockerCall<Value>| {
            Ok(input.get("user").cloned().unwrap_or(Value::Null))
        });
        let mut flow: Flow = Flow::new(flow_blocker);
        flow.append_fn(
            |input, next| {
                input.set("user", "alice");
                next.run(input)
            },
            End::Back,
        );

        assert_eq!(flow.start_empty().unwrap(), json!("alice"));
    }

    #[test]
    fn test_start_is_repeatable() {
        let mut flow: Flow = Flow::default();
        flow.append(Matcher::new("a", json!(1)), End::Back);

        for _ in 0..3 {
            let mut input = Input::from([("key", "a")]);
            assert_eq!(flow.start(&mut input).unwrap(), json!(1));
        }
        assert_eq!(flow.len(), 1);
    }

    #[test]
    fn test_store_management_delegates() {
        let mut flow: Flow = Flow::default();
        assert!(flow.is_empty());
        assert_eq!(flow.append(Tagged::new("a"), End::Back), 1);
        assert_eq!(flow.append(Tagged::new("b"), End::Back), 2);
        assert_eq!(flow.remove_one(End::Front).unwrap().name(), "a");
        assert_eq!(flow.len(), 1);
        assert!(flow.clear().is_empty());
        assert_eq!(flow.remove_one(End::Front).err(), Some(FlowError::EmptyStore));
    }

    #[test]
    fn test_removed_processor_can_be_reinserted() {
        let mut flow: Flow = Flow::default();
        flow.append(Tagged::new("a"), End::Back);
        flow.append(Tagged::new("b"), End::Back);

        let a = flow.remove_one(End::Front).unwrap();
        flow.append_shared(a, End::Back);

        let mut input = Input::new();
        flow.start(&mut input).unwrap();
        assert_eq!(input.get("trace"), Some(&json!(["b", "a"])));
    }

    #[test]
    fn test_debug_shows_processor_names() {
        let mut flow: Flow = Flow::default();
        flow.append(Tagged::new("a"), End::Back);
        let debug = format!("{flow:?}");
        assert!(debug.contains("\"a\""), "{debug}");
    }
}
