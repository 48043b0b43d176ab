//! Configuration for the event dispatcher.

use crate::{Error, Result};
use std::time::Duration;

/// Configuration for [`EventDispatcher`](crate::EventDispatcher)
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Deadline applied by `dispatch_with_deadline`; `None` waits forever
    pub dispatch_timeout: Option<Duration>,

    /// Number of event names to pre-allocate in the registry
    pub initial_capacity: usize,

    /// Emit per-dispatch debug/trace events
    pub enable_tracing: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout: None,
            initial_capacity: 64,
            enable_tracing: true,
        }
    }
}

impl DispatcherConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch deadline
    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    /// Remove the dispatch deadline
    pub fn no_dispatch_timeout(mut self) -> Self {
        self.dispatch_timeout = None;
        self
    }

    /// Set the registry capacity
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Enable tracing
    pub fn enable_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }

    /// Check the configuration for values that can never work
    pub fn validate(&self) -> Result<()> {
        if self.dispatch_timeout == Some(Duration::ZERO) {
            return Err(Error::config("dispatch_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Configuration for testing
    pub fn test() -> Self {
        Self::default()
            .dispatch_timeout(Duration::from_secs(5))
            .initial_capacity(8)
            .enable_tracing(false)
    }
}
