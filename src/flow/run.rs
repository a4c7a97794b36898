//! Execution of a single flow run
//!
//! A run walks a snapshot of processors through [`Next`], then settles the
//! outcome with the blocker. Runs are independent: nothing here outlives a
//! call to [`execute`].

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::blocker::Blocker;
use super::processor::{Next, ProcessorRef};
use crate::error::Fault;

/// Whether a value produced by a processor passes through the blocker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// The value is returned to the caller unchanged
    #[default]
    Passthrough,
    /// The value is handed to [`Blocker::complete`] before being returned
    Blocker,
}

/// How a run settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// A processor produced the result
    Resolved,
    /// The chain was exhausted and the blocker's missed case produced the result
    Missed,
    /// The run faulted and the blocker returned a substitute value
    Recovered,
    /// The run faulted and the blocker re-raised
    Faulted,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resolved => "resolved",
            Self::Missed => "missed",
            Self::Recovered => "recovered",
            Self::Faulted => "faulted",
        };
        f.write_str(label)
    }
}

/// Result of a run together with how it was reached
#[derive(Debug)]
pub struct RunReport<O> {
    /// The value or propagated fault returned to the caller
    pub result: Result<O, Fault>,
    /// How the run settled
    pub resolution: Resolution,
    /// Number of processors in the snapshot
    pub processors: usize,
    /// Number of processors that were entered
    pub steps: usize,
    /// Wall time spent in the run
    pub elapsed: Duration,
}

impl<O> RunReport<O> {
    /// Discard the report details, keeping the result
    pub fn into_result(self) -> Result<O, Fault> {
        self.result
    }
}

/// Per-run bookkeeping shared by the continuations of one run
#[derive(Debug, Default)]
pub(crate) struct RunState {
    steps: Cell<usize>,
    exhausted: Cell<bool>,
}

impl RunState {
    /// Record that a processor is entered, returning its 0-based position
    pub(crate) fn enter(&self) -> usize {
        let step = self.steps.get();
        self.steps.set(step + 1);
        step
    }

    pub(crate) fn mark_exhausted(&self) {
        self.exhausted.set(true);
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted.get()
    }

    pub(crate) fn steps(&self) -> usize {
        self.steps.get()
    }
}

/// Run `input` through `processors`, settling with `blocker`
///
/// Any fault raised by a processor, by the missed case or by the complete
/// case is handed to [`Blocker::error`] exactly once. A fault raised by
/// `error` itself is returned as is.
pub(crate) fn execute<I, O>(
    processors: &[ProcessorRef<I, O>],
    blocker: &dyn Blocker<I, O>,
    completion: Completion,
    input: &mut I,
) -> RunReport<O> {
    let started = Instant::now();
    let state = RunState::default();
    debug!(processors = processors.len(), "flow run started");

    let chained = Next::new(processors, blocker, &state)
        .run(input)
        .and_then(|value| {
            if state.is_exhausted() || completion == Completion::Passthrough {
                Ok(value)
            } else {
                blocker.complete(input, value)
            }
        });

    let (result, resolution) = match chained {
        Ok(value) if state.is_exhausted() => (Ok(value), Resolution::Missed),
        Ok(value) => (Ok(value), Resolution::Resolved),
        Err(fault) => {
            debug!(error = %fault, "flow run faulted, invoking blocker");
            match blocker.error(input, fault) {
                Ok(value) => (Ok(value), Resolution::Recovered),
                Err(fault) => (Err(fault), Resolution::Faulted),
            }
        }
    };

    let elapsed = started.elapsed();
    debug!(
        %resolution,
        steps = state.steps(),
        elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        "flow run finished"
    );

    RunReport {
        result,
        resolution,
        processors: processors.len(),
        steps: state.steps(),
        elapsed,
    }
}
