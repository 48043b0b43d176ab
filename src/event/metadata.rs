//! Event metadata for tracking and correlation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata associated with each envelope.
///
/// Nothing here influences dispatch. It exists so handlers can correlate
/// events and log where they came from.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    /// Identity of this particular envelope
    pub event_id: Uuid,

    /// When the envelope was created
    pub timestamp: DateTime<Utc>,

    /// Shared by every event descending from the same root
    pub correlation_id: Option<Uuid>,

    /// `event_id` of the direct parent, if any
    pub causation_id: Option<Uuid>,

    /// Component that generated this event
    pub source: Option<String>,

    /// Free-form attributes
    pub attributes: HashMap<String, String>,
}

impl EventMetadata {
    /// Create new metadata with a generated event ID and the current timestamp
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            correlation_id: None,
            causation_id: None,
            source: None,
            attributes: HashMap::new(),
        }
    }

    /// Attach to an existing correlation chain
    pub fn set_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Record which component emitted the event
    pub fn set_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get an attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Mark this metadata as caused by `parent`, inheriting its correlation
    pub fn chain_from(&mut self, parent: &EventMetadata) {
        self.causation_id = Some(parent.event_id);
        self.correlation_id = parent.correlation_id.or(Some(parent.event_id));

        if self.source.is_none() {
            self.source = parent.source.clone();
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Step-by-step construction of [`EventMetadata`]
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    metadata: EventMetadata,
}

impl MetadataBuilder {
    /// Start from fresh metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.metadata.timestamp = timestamp;
        self
    }

    /// Join an existing correlation chain
    pub fn correlation_id(mut self, id: Uuid) -> Self {
        self.metadata.correlation_id = Some(id);
        self
    }

    /// Point at the parent event
    pub fn causation_id(mut self, id: Uuid) -> Self {
        self.metadata.causation_id = Some(id);
        self
    }

    /// Emitting component
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    /// Add an attribute
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.attributes.insert(key.into(), value.into());
        self
    }

    /// Build the metadata
    pub fn build(self) -> EventMetadata {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_creation() {
        let first = EventMetadata::new();
        let second = EventMetadata::new();
        assert_ne!(first.event_id, Uuid::nil());
        assert_ne!(first.event_id, second.event_id);
        assert!(first.correlation_id.is_none());
        assert!(first.attributes.is_empty());
    }

    #[test]
    fn test_metadata_builder() {
        let correlation_id = Uuid::new_v4();
        let metadata = MetadataBuilder::new()
            .correlation_id(correlation_id)
            .source("billing")
            .attribute("tenant", "acme")
            .build();

        assert_eq!(metadata.correlation_id, Some(correlation_id));
        assert_eq!(metadata.source.as_deref(), Some("billing"));
        assert_eq!(metadata.attribute("tenant"), Some("acme"));
        assert_eq!(metadata.attribute("missing"), None);
    }

    #[test]
    fn test_metadata_chaining() {
        let parent = EventMetadata::new().set_source("orders");

        let mut child = EventMetadata::new();
        child.chain_from(&parent);

        assert_eq!(child.causation_id, Some(parent.event_id));
        assert_eq!(child.correlation_id, Some(parent.event_id));
        assert_eq!(child.source.as_deref(), Some("orders"));

        let mut grandchild = EventMetadata::new();
        grandchild.chain_from(&child);
        assert_eq!(grandchild.causation_id, Some(child.event_id));
        assert_eq!(grandchild.correlation_id, Some(parent.event_id));
    }
}
