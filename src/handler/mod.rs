//! Event handler traits and identity.

use crate::dispatcher::Completion;
use crate::Event;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

mod function;

pub use function::FunctionHandler;

/// Trait for handlers reacting to dispatched events.
///
/// `handle` receives the event and a [`Completion`] token for the current
/// dispatch. The dispatcher waits until every invoked handler has called
/// [`Completion::done`]. The token can be moved elsewhere, e.g. into a task
/// that finishes the work in the background, and signaled from there.
///
/// A token dropped without being signaled still releases the dispatch, but
/// is reported as unsignaled.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use event_dispatcher::{Completion, Event, EventHandler};
/// use std::sync::Arc;
///
/// struct AuditLog;
///
/// #[async_trait]
/// impl EventHandler for AuditLog {
///     async fn handle(&self, event: Arc<dyn Event>, done: Completion) {
///         println!("{} at {}", event.name(), event.date_time());
///         done.done();
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// React to an event and signal completion exactly once
    async fn handle(&self, event: Arc<dyn Event>, done: Completion);

    /// Get the handler name for logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Identity of a registered handler instance.
///
/// Two handlers are the same iff they share the same `Arc` allocation;
/// handlers with equal state but separate allocations are distinct. The
/// id stays unique for as long as the registry holds the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Identity of the instance behind `handler`
    pub fn of<H: ?Sized>(handler: &Arc<H>) -> Self {
        Self(Arc::as_ptr(handler) as *const () as usize)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: usize) -> Self {
        Self(raw)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler@{:#x}", self.0)
    }
}
