//! Double-ended processor store
//!
//! Processors can be pushed and popped at either end. Positions are never
//! exposed; the only whole-sequence view is an ordered snapshot.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use super::processor::{Processor, ProcessorRef};
use crate::error::FlowError;

/// One end of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// The end whose processor runs first
    Front,
    /// The end whose processor runs last
    Back,
}

/// Ordered, double-ended sequence of processors
pub struct ProcessorStore<I, O> {
    processors: VecDeque<ProcessorRef<I, O>>,
}

impl<I, O> ProcessorStore<I, O> {
    /// Create an empty store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            processors: VecDeque::new(),
        }
    }

    /// Insert a processor at the given end, returning the new count
    pub fn append<P>(&mut self, processor: P, at: End) -> usize
    where
        P: Processor<I, O> + 'static,
    {
        self.append_shared(Arc::new(processor), at)
    }

    /// Insert an already shared processor at the given end, returning the new count
    pub fn append_shared(&mut self, processor: ProcessorRef<I, O>, at: End) -> usize {
        match at {
            End::Front => self.processors.push_front(processor),
            End::Back => self.processors.push_back(processor),
        }
        self.processors.len()
    }

    /// Remove one processor from the given end
    pub fn remove_one(&mut self, from: End) -> Result<ProcessorRef<I, O>, FlowError> {
        let removed = match from {
            End::Front => self.processors.pop_front(),
            End::Back => self.processors.pop_back(),
        };
        removed.ok_or(FlowError::EmptyStore)
    }

    /// Remove every processor
    pub fn clear(&mut self) -> &mut Self {
        self.processors.clear();
        self
    }

    /// Returns true if the store holds no processors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Number of processors
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Snapshot of the processors, front to back
    #[must_use]
    pub fn to_ordered_list(&self) -> Vec<ProcessorRef<I, O>> {
        self.processors.iter().cloned().collect()
    }
}

impl<I, O> Default for ProcessorStore<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> fmt::Debug for ProcessorStore<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.processors.iter().map(|p| p.name()))
            .finish()
    }
}
