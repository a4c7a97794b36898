//! Event dispatch
//!
//! A minimal synchronous dispatcher. Listeners are called in registration
//! order on the dispatching thread.

use std::fmt;

use tracing::trace;

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Dispatches events of type `E` to registered listeners
pub struct Dispatcher<E> {
    listeners: Vec<Listener<E>>,
}

impl<E: fmt::Debug> Dispatcher<E> {
    /// Create a dispatcher with no listeners
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener
    pub fn listen<F>(&mut self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver `event` to every listener, returning how many were notified
    pub fn dispatch(&self, event: &E) -> usize {
        trace!(?event, listeners = self.listeners.len(), "dispatching event");
        for listener in &self.listeners {
            listener(event);
        }
        self.listeners.len()
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: fmt::Debug> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
