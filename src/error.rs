//! Error types
//!
//! Two channels exist and they are kept apart:
//!
//! - [`FlowError`] is returned by store management and flow construction.
//!   These are caller mistakes (removing from an empty store, naming a
//!   blocker kind that does not exist) and are never routed to a blocker.
//! - [`Fault`] is anything raised while a run is in progress. Faults are
//!   caught once at the flow boundary and handed to the blocker.

use thiserror::Error;

/// A failure raised by a processor or blocker during a run.
///
/// Faults keep their concrete type, so callers can `downcast_ref` to find
/// out exactly what a processor raised.
pub type Fault = anyhow::Error;

/// Errors raised by store management and flow construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// `remove_one` was called on a store with no processors
    #[error("cannot remove a processor from an empty store")]
    EmptyStore,

    /// A blocker or processor definition could not be turned into a flow
    #[error("invalid flow configuration: {0}")]
    InvalidConfiguration(String),
}
