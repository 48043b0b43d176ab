//! Core event traits and types.
//!
//! This module defines the `Event` capability that every dispatched value
//! provides, plus `EventEnvelope`, a general-purpose event carrying an
//! arbitrary payload.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt::Debug;

pub mod envelope;
pub mod metadata;

pub use envelope::{EnvelopeBuilder, EventEnvelope};
pub use metadata::{EventMetadata, MetadataBuilder};

/// Core trait that all dispatched events implement.
///
/// The dispatcher only ever calls [`Event::name`] to pick the handlers to
/// run. Payload and timestamp are for handlers.
///
/// The trait is object safe: handlers receive events as `Arc<dyn Event>`.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, Utc};
/// use event_dispatcher::Event;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct UserRegistered {
///     email: String,
///     at: DateTime<Utc>,
/// }
///
/// impl Event for UserRegistered {
///     fn name(&self) -> &str {
///         "user.registered"
///     }
///
///     fn payload(&self) -> &(dyn Any + Send + Sync) {
///         &self.email
///     }
///
///     fn date_time(&self) -> DateTime<Utc> {
///         self.at
///     }
/// }
/// ```
pub trait Event: Send + Sync + Debug + 'static {
    /// Stable name identifying the event category; used as the registration key.
    fn name(&self) -> &str;

    /// Opaque data carried by the event.
    fn payload(&self) -> &(dyn Any + Send + Sync);

    /// Point in time the event was created or observed.
    fn date_time(&self) -> DateTime<Utc>;
}

impl dyn Event {
    /// Try to view the payload as a concrete type
    pub fn payload_ref<T: Any>(&self) -> Option<&T> {
        self.payload().downcast_ref::<T>()
    }
}
