//! Flow usable from several threads
//!
//! The store sits behind a mutex. Starting a run only holds the lock while
//! the snapshot is taken, so runs never block store mutation and a run in
//! progress never observes one.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::blocker::Blocker;
use super::processor::{Processor, ProcessorRef};
use super::run::{self, Completion, RunReport};
use super::store::{End, ProcessorStore};
use crate::error::{Fault, FlowError};
use crate::input::Input;
use serde_json::Value;

/// A [`Flow`](super::Flow) whose store is guarded by a mutex
pub struct SharedFlow<I = Input, O = Value> {
    blocker: Arc<dyn Blocker<I, O>>,
    store: Mutex<ProcessorStore<I, O>>,
    completion: Completion,
}

impl<I, O> SharedFlow<I, O> {
    pub(crate) const fn from_parts(
        blocker: Arc<dyn Blocker<I, O>>,
        store: ProcessorStore<I, O>,
        completion: Completion,
    ) -> Self {
        Self {
            blocker,
            store: Mutex::new(store),
            completion,
        }
    }

    fn store(&self) -> MutexGuard<'_, ProcessorStore<I, O>> {
        // A panicking processor never runs under the lock, so the store is consistent.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a processor at the given end, returning the new count
    pub fn append<P>(&self, processor: P, at: End) -> usize
    where
        P: Processor<I, O> + 'static,
    {
        self.store().append(processor, at)
    }

    /// Insert an already shared processor, returning the new count
    pub fn append_shared(&self, processor: ProcessorRef<I, O>, at: End) -> usize {
        self.store().append_shared(processor, at)
    }

    /// Remove one processor from the given end
    pub fn remove_one(&self, from: End) -> Result<ProcessorRef<I, O>, FlowError> {
        self.store().remove_one(from)
    }

    /// Remove every processor
    pub fn clear(&self) {
        self.store().clear();
    }

    /// Returns true if the flow has no processors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Number of processors
    #[must_use]
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Snapshot of the processors in execution order
    #[must_use]
    pub fn to_ordered_list(&self) -> Vec<ProcessorRef<I, O>> {
        self.store().to_ordered_list()
    }

    /// Run `input` through the flow
    pub fn start(&self, input: &mut I) -> Result<O, Fault> {
        self.run(input).into_result()
    }

    /// Run `input` through the flow, reporting how the run settled
    pub fn run(&self, input: &mut I) -> RunReport<O> {
        let snapshot = self.to_ordered_list();
        run::execute(&snapshot, self.blocker.as_ref(), self.completion, input)
    }
}

impl<I, O> fmt::Debug for SharedFlow<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFlow")
            .field("processors", &*self.store())
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}
