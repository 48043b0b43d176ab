//! General-purpose event carrying a type-erased payload.

use crate::event::{Event, EventMetadata};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A named event wrapping any payload.
///
/// Use this when a dedicated `Event` type per event category is not worth
/// writing. The payload is shared, so cloning an envelope is cheap.
#[derive(Clone)]
pub struct EventEnvelope {
    /// Event name used as the dispatch key
    name: String,

    /// The type-erased event payload
    payload: Arc<dyn Any + Send + Sync>,

    /// Human-readable payload type name for debugging
    payload_type: &'static str,

    /// Event metadata
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Create a new envelope
    pub fn new<P>(name: impl Into<String>, payload: P) -> Self
    where
        P: Any + Send + Sync,
    {
        Self::with_metadata(name, payload, EventMetadata::new())
    }

    /// Create a new envelope with custom metadata
    pub fn with_metadata<P>(name: impl Into<String>, payload: P, metadata: EventMetadata) -> Self
    where
        P: Any + Send + Sync,
    {
        Self {
            name: name.into(),
            payload: Arc::new(payload),
            payload_type: std::any::type_name::<P>(),
            metadata,
        }
    }

    /// Start building an envelope
    pub fn builder<P>(name: impl Into<String>, payload: P) -> EnvelopeBuilder<P>
    where
        P: Any + Send + Sync,
    {
        EnvelopeBuilder::new(name, payload)
    }

    /// Try to downcast the payload to a specific type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Check if the payload is of a specific type
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Type name of the payload
    pub fn payload_type(&self) -> &'static str {
        self.payload_type
    }

    /// Get the event ID
    pub fn event_id(&self) -> uuid::Uuid {
        self.metadata.event_id
    }

    /// Get the correlation ID from metadata
    pub fn correlation_id(&self) -> Option<uuid::Uuid> {
        self.metadata.correlation_id
    }

    /// Create a new envelope caused by this one
    pub fn chain<P>(&self, name: impl Into<String>, payload: P) -> Self
    where
        P: Any + Send + Sync,
    {
        let mut metadata = EventMetadata::new();
        metadata.chain_from(&self.metadata);
        Self::with_metadata(name, payload, metadata)
    }
}

impl Event for EventEnvelope {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &(dyn Any + Send + Sync) {
        &*self.payload
    }

    fn date_time(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("name", &self.name)
            .field("payload_type", &self.payload_type)
            .field("event_id", &self.metadata.event_id)
            .field("correlation_id", &self.metadata.correlation_id)
            .finish()
    }
}

/// Builder for creating event envelopes with custom metadata
#[derive(Debug)]
pub struct EnvelopeBuilder<P> {
    name: String,
    payload: P,
    metadata: EventMetadata,
}

impl<P: Any + Send + Sync> EnvelopeBuilder<P> {
    /// Create a new envelope builder
    pub fn new(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
            metadata: EventMetadata::new(),
        }
    }

    /// Set custom metadata
    pub fn metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.metadata.timestamp = timestamp;
        self
    }

    /// Set correlation ID
    pub fn correlation_id(mut self, id: uuid::Uuid) -> Self {
        self.metadata.correlation_id = Some(id);
        self
    }

    /// Set event source
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    /// Build the envelope
    pub fn build(self) -> EventEnvelope {
        EventEnvelope::with_metadata(self.name, self.payload, self.metadata)
    }
}
