//! Error types for the event dispatcher.

use crate::handler::HandlerId;
use thiserror::Error;

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the event dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The same handler instance is already registered under this event name
    #[error("Handler {handler_id} is already registered for event '{event_name}'")]
    HandlerAlreadyRegistered {
        /// Event name the registration was attempted for
        event_name: String,
        /// Identity of the duplicate handler
        handler_id: HandlerId,
    },

    /// Handlers did not all signal completion before the deadline
    #[error("Dispatch of '{event_name}' timed out with {pending} handler(s) still pending")]
    DispatchTimeout {
        /// Name of the event being dispatched
        event_name: String,
        /// Number of handlers that had not signaled completion
        pending: usize,
    },

    /// The process-wide dispatcher was already installed
    #[error("Global event dispatcher is already initialized")]
    GlobalAlreadyInitialized,

    /// The process-wide dispatcher was used before being installed
    #[error("Global event dispatcher is not initialized")]
    GlobalNotInitialized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this error is a duplicate registration
    pub fn is_already_registered(&self) -> bool {
        matches!(self, Error::HandlerAlreadyRegistered { .. })
    }

    /// Check if this error is a dispatch deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::DispatchTimeout { .. })
    }
}
