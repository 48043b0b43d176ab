//! # event-dispatcher
//!
//! An in-process event dispatcher for Tokio applications: handlers register
//! against event names, and dispatching an event runs every matching handler
//! concurrently, then waits until all of them have signaled completion.
//!
//! ## Features
//!
//! - **Named routing**: any type implementing [`Event`] is dispatched by name
//! - **Identity-based registration**: a handler instance registers at most
//!   once per name, compared by `Arc` identity rather than value
//! - **Concurrent fan-out** with a per-dispatch completion barrier
//! - **Failure isolation**: a panicking or non-signaling handler never
//!   blocks the dispatch or the other handlers
//! - **Thread-safe** registry shared by all operations
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use event_dispatcher::{Completion, Event, EventDispatcher, EventEnvelope, EventHandler};
//! use std::sync::Arc;
//!
//! struct SendWelcomeEmail;
//!
//! #[async_trait]
//! impl EventHandler for SendWelcomeEmail {
//!     async fn handle(&self, event: Arc<dyn Event>, done: Completion) {
//!         if let Some(email) = event.payload_ref::<String>() {
//!             println!("welcome, {email}");
//!         }
//!         done.done();
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = EventDispatcher::new();
//!
//!     let handler = Arc::new(SendWelcomeEmail);
//!     dispatcher.register("user.registered", handler.clone())?;
//!
//!     let report = dispatcher
//!         .dispatch(EventEnvelope::new("user.registered", "user@example.com".to_string()))
//!         .await;
//!     assert!(report.is_clean());
//!
//!     dispatcher.remove("user.registered", &handler);
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    unreachable_pub
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Core event traits and types
pub mod event;

/// Error types and result aliases
pub mod error;

/// Handler traits and identity
pub mod handler;

/// Registration table mapping event names to handlers
pub mod registry;

/// The dispatcher and its completion barrier
pub mod dispatcher;

/// Explicitly initialised process-wide dispatcher
pub mod global;

// Re-export commonly used types
pub use dispatcher::{
    Completion, CompletionBarrier, DispatchReport, DispatcherConfig, DispatcherStats,
    EventDispatcher, EventDispatcherBuilder,
};
pub use error::{Error, Result};
pub use event::{EnvelopeBuilder, Event, EventEnvelope, EventMetadata};
pub use handler::{EventHandler, FunctionHandler, HandlerId};
pub use registry::{DashMapRegistry, HandlerRegistry, RegistryStats};

/// Prelude module for convenient imports
///
/// # Example
/// ```rust
/// use event_dispatcher::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dispatcher::{Completion, DispatchReport, EventDispatcher};
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, EventEnvelope};
    pub use crate::handler::{EventHandler, FunctionHandler, HandlerId};
}
