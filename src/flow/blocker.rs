//! Blocker capability and built-in blockers
//!
//! The blocker is the terminal stage of a flow. It decides the result when
//! the chain runs out of processors, optionally gets a last look at a value
//! a processor produced, and decides what happens to a fault.

use std::sync::Arc;

use tracing::warn;

use crate::error::Fault;

/// Terminal fallback of a flow
pub trait Blocker<I, O>: Send + Sync {
    /// Every processor delegated onward and the chain is exhausted
    fn missed(&self, input: &mut I) -> Result<O, Fault>;

    /// A processor produced `result`
    ///
    /// Only called when the flow completes through the blocker
    /// (see [`Completion::Blocker`](super::Completion::Blocker)).
    fn complete(&self, _input: &mut I, result: O) -> Result<O, Fault> {
        Ok(result)
    }

    /// A processor or the blocker itself raised `fault`
    ///
    /// Returning `Ok` recovers the run. Returning `Err` propagates the
    /// error to the caller of `start` unchanged.
    fn error(&self, input: &mut I, fault: Fault) -> Result<O, Fault>;
}

/// The case a [`CallableBlocker`] is being invoked for
#[derive(Debug)]
pub enum BlockerCall<O> {
    /// The chain was exhausted
    Missed,
    /// A processor produced a value
    Completed(O),
    /// The run faulted
    Faulted(Fault),
}

/// Default blocker: missed yields `O::default()`, faults are re-raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptionBlocker;

impl<I, O: Default> Blocker<I, O> for ExceptionBlocker {
    fn missed(&self, _input: &mut I) -> Result<O, Fault> {
        Ok(O::default())
    }

    fn error(&self, _input: &mut I, fault: Fault) -> Result<O, Fault> {
        Err(fault)
    }
}

/// Returns a fixed value when the chain is exhausted and when a run faults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackBlocker<O> {
    value: O,
}

impl<O> FallbackBlocker<O> {
    /// Create a blocker that falls back to `value`
    pub const fn new(value: O) -> Self {
        Self { value }
    }

    /// The fallback value
    pub const fn value(&self) -> &O {
        &self.value
    }
}

impl<I, O: Clone + Send + Sync> Blocker<I, O> for FallbackBlocker<O> {
    fn missed(&self, _input: &mut I) -> Result<O, Fault> {
        Ok(self.value.clone())
    }

    fn error(&self, _input: &mut I, fault: Fault) -> Result<O, Fault> {
        warn!(error = %fault, "flow faulted, returning fallback value");
        Ok(self.value.clone())
    }
}

/// Adapts a plain function into a [`Blocker`]
///
/// The function receives the input and a [`BlockerCall`] naming the case.
pub struct CallableBlocker<F> {
    callable: Arc<F>,
}

impl<F> CallableBlocker<F> {
    /// Wrap a function
    pub fn new<I, O>(callable: F) -> Self
    where
        F: Fn(&mut I, BlockerCall<O>) -> Result<O, Fault> + Send + Sync,
    {
        Self::from_shared(Arc::new(callable))
    }

    /// Wrap a function that is already shared
    pub const fn from_shared(callable: Arc<F>) -> Self {
        Self { callable }
    }

    /// The wrapped function
    #[must_use]
    pub const fn callable(&self) -> &Arc<F> {
        &self.callable
    }
}

impl<I, O, F> Blocker<I, O> for CallableBlocker<F>
where
    F: Fn(&mut I, BlockerCall<O>) -> Result<O, Fault> + Send + Sync,
{
    fn missed(&self, input: &mut I) -> Result<O, Fault> {
        (self.callable)(input, BlockerCall::Missed)
    }

    fn complete(&self, input: &mut I, result: O) -> Result<O, Fault> {
        (self.callable)(input, BlockerCall::Completed(result))
    }

    fn error(&self, input: &mut I, fault: Fault) -> Result<O, Fault> {
        (self.callable)(input, BlockerCall::Faulted(fault))
    }
}
