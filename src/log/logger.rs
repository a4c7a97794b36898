//! Channel logger backed by a handler chain

use serde_json::{Map, Value};

use super::handlers::LogBlocker;
use super::record::{Level, LogRecord};
use crate::flow::{End, Flow, Processor, ProcessorRef};

/// Sends records on one channel through a chain of handlers
pub struct Logger {
    channel: String,
    handlers: Flow<LogRecord, usize>,
}

impl Logger {
    /// Create a logger with no handlers
    #[must_use]
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            handlers: Flow::new(LogBlocker),
        }
    }

    /// The channel name stamped on every record
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Push a handler on top of the stack
    ///
    /// The most recently pushed handler sees records first.
    pub fn push_handler<P>(&mut self, handler: P) -> usize
    where
        P: Processor<LogRecord, usize> + 'static,
    {
        self.handlers.append(handler, End::Front)
    }

    /// Handlers in the order records reach them
    #[must_use]
    pub fn handlers(&self) -> Vec<ProcessorRef<LogRecord, usize>> {
        self.handlers.to_ordered_list()
    }

    /// Log a message with context, returning how many handlers wrote it
    pub fn log(&self, level: Level, message: &str, context: Map<String, Value>) -> usize {
        let mut record = LogRecord::new(level, &self.channel, message);
        record.context = context;
        // LogBlocker recovers every fault, so the chain cannot fail
        self.handlers
            .start(&mut record)
            .unwrap_or(record.handled_by.len())
    }

    /// Log at [`Level::Debug`]
    pub fn debug(&self, message: &str) -> usize {
        self.log(Level::Debug, message, Map::new())
    }

    /// Log at [`Level::Info`]
    pub fn info(&self, message: &str) -> usize {
        self.log(Level::Info, message, Map::new())
    }

    /// Log at [`Level::Warning`]
    pub fn warning(&self, message: &str) -> usize {
        self.log(Level::Warning, message, Map::new())
    }

    /// Log at [`Level::Error`]
    pub fn error(&self, message: &str) -> usize {
        self.log(Level::Error, message, Map::new())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("channel", &self.channel)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
