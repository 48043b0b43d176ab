//! Registration table mapping event names to handlers.
//!
//! The registry keeps, per event name, the handlers in registration order
//! and guarantees that a handler instance appears at most once per name.

use crate::handler::{EventHandler, HandlerId};
use crate::Result;
use std::fmt::{self, Debug};
use std::sync::Arc;

mod dashmap;
pub use self::dashmap::DashMapRegistry;

/// A registered handler together with its identity
#[derive(Clone)]
pub struct HandlerEntry {
    /// Identity of the handler instance
    pub id: HandlerId,

    /// The shared handler
    pub handler: Arc<dyn EventHandler>,
}

impl HandlerEntry {
    /// Create an entry for `handler`
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            id: HandlerId::of(&handler),
            handler,
        }
    }
}

impl Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("name", &self.handler.name())
            .finish()
    }
}

/// Trait for tables mapping event names to ordered handler lists.
///
/// Implementations must be thread-safe; every operation is atomic with
/// respect to the others for a given event name.
pub trait HandlerRegistry: Send + Sync + Debug {
    /// Append a handler, failing if the same instance is already registered
    fn register(&self, event_name: &str, entry: HandlerEntry) -> Result<()>;

    /// Remove a handler; returns whether anything was removed
    fn remove(&self, event_name: &str, handler_id: HandlerId) -> bool;

    /// Check whether a handler is registered under `event_name`
    fn contains(&self, event_name: &str, handler_id: HandlerId) -> bool;

    /// Snapshot of the handlers for `event_name`, in registration order
    fn handlers(&self, event_name: &str) -> Vec<HandlerEntry>;

    /// Number of handlers registered under `event_name`
    fn handler_count(&self, event_name: &str) -> usize;

    /// Event names that currently have at least one handler
    fn event_names(&self) -> Vec<String>;

    /// Total number of registrations across all names
    fn total_handlers(&self) -> usize;

    /// Remove every registration
    fn clear(&self);
}

/// Registry statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of event names with handlers
    pub event_names: usize,

    /// Total number of registrations
    pub total_handlers: usize,

    /// Largest number of handlers under a single name
    pub max_fan_out: usize,
}

/// Extension trait for registries with statistics
pub trait RegistryStatistics: HandlerRegistry {
    /// Get current registry statistics
    fn stats(&self) -> RegistryStats {
        let names = self.event_names();
        let mut total = 0;
        let mut max_fan_out = 0;

        for name in &names {
            let count = self.handler_count(name);
            total += count;
            max_fan_out = max_fan_out.max(count);
        }

        RegistryStats {
            event_names: names.len(),
            total_handlers: total,
            max_fan_out,
        }
    }
}

impl<T: HandlerRegistry + ?Sized> RegistryStatistics for T {}
