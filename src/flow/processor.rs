//! Processor capability and the continuation handed to it
//!
//! A processor receives the input and a [`Next`]. It either returns a value,
//! which resolves the run, or calls [`Next::run`] to hand the input to the
//! next processor. `Next` is consumed by `run`, so a processor can advance
//! the chain at most once.

use std::sync::Arc;

use tracing::trace;

use super::blocker::Blocker;
use super::run::RunState;
use crate::error::Fault;

/// Shared handle to a processor, as held by a store
pub type ProcessorRef<I, O> = Arc<dyn Processor<I, O>>;

/// A unit of work in a flow
pub trait Processor<I, O>: Send + Sync {
    /// Handle the input, either resolving the run or delegating to `next`
    fn process(&self, input: &mut I, next: Next<'_, I, O>) -> Result<O, Fault>;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Continuation to the rest of the chain
///
/// Walks a snapshot of the processors. When no processors remain, running
/// it invokes the blocker's missed case.
pub struct Next<'a, I, O> {
    rest: &'a [ProcessorRef<I, O>],
    blocker: &'a dyn Blocker<I, O>,
    state: &'a RunState,
}

impl<'a, I, O> Next<'a, I, O> {
    pub(crate) fn new(
        rest: &'a [ProcessorRef<I, O>],
        blocker: &'a dyn Blocker<I, O>,
        state: &'a RunState,
    ) -> Self {
        Self {
            rest,
            blocker,
            state,
        }
    }

    /// Number of processors still ahead of this continuation
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Advance to the next processor, or to the blocker if none remain
    pub fn run(self, input: &mut I) -> Result<O, Fault> {
        match self.rest.split_first() {
            Some((processor, rest)) => {
                let step = self.state.enter();
                trace!(step, processor = processor.name(), "processor entered");
                processor.process(input, Next { rest, ..self })
            }
            None => {
                self.state.mark_exhausted();
                trace!("chain exhausted, invoking blocker");
                self.blocker.missed(input)
            }
        }
    }
}

/// Adapts a plain function into a [`Processor`]
///
/// The function is held behind an `Arc`, so two adapters built with
/// [`CallableProcessor::from_shared`] forward to the same function while
/// remaining distinct processors.
pub struct CallableProcessor<F> {
    name: String,
    callable: Arc<F>,
}

impl<F> CallableProcessor<F> {
    /// Wrap a function
    pub fn new<I, O>(callable: F) -> Self
    where
        F: Fn(&mut I, Next<'_, I, O>) -> Result<O, Fault> + Send + Sync,
    {
        Self::from_shared(Arc::new(callable))
    }

    /// Wrap a function that is already shared
    pub fn from_shared(callable: Arc<F>) -> Self {
        Self {
            name: "callable".to_string(),
            callable,
        }
    }

    /// Set the diagnostic name
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// The wrapped function
    #[must_use]
    pub const fn callable(&self) -> &Arc<F> {
        &self.callable
    }
}

impl<I, O, F> Processor<I, O> for CallableProcessor<F>
where
    F: Fn(&mut I, Next<'_, I, O>) -> Result<O, Fault> + Send + Sync,
{
    fn process(&self, input: &mut I, next: Next<'_, I, O>) -> Result<O, Fault> {
        (self.callable)(input, next)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
