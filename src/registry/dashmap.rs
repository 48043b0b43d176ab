//! DashMap-based implementation of HandlerRegistry for concurrent access.

use super::{HandlerEntry, HandlerRegistry};
use crate::handler::HandlerId;
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A thread-safe handler registry backed by a sharded map.
///
/// Operations on one event name serialize on that name's shard, so
/// check-and-append in `register` cannot race with another `register` or
/// `remove` for the same name. Snapshots returned by `handlers` are copies;
/// callers run handlers without holding any shard lock.
#[derive(Debug, Clone)]
pub struct DashMapRegistry {
    /// Map from event name to handlers in registration order
    handlers: Arc<DashMap<String, Vec<HandlerEntry>>>,
}

impl DashMapRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
        }
    }

    /// Create a registry with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handlers: Arc::new(DashMap::with_capacity(capacity)),
        }
    }
}

impl Default for DashMapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry for DashMapRegistry {
    fn register(&self, event_name: &str, entry: HandlerEntry) -> Result<()> {
        trace!(
            event_name,
            handler_id = %entry.id,
            handler_name = entry.handler.name(),
            "Registering handler"
        );

        let mut list = self.handlers.entry(event_name.to_owned()).or_default();

        if list.iter().any(|existing| existing.id == entry.id) {
            return Err(Error::HandlerAlreadyRegistered {
                event_name: event_name.to_owned(),
                handler_id: entry.id,
            });
        }

        let handler_id = entry.id;
        list.push(entry);

        debug!(
            event_name,
            handler_id = %handler_id,
            position = list.len() - 1,
            "Handler registered"
        );
        Ok(())
    }

    fn remove(&self, event_name: &str, handler_id: HandlerId) -> bool {
        trace!(event_name, handler_id = %handler_id, "Removing handler");

        let removed = match self.handlers.get_mut(event_name) {
            Some(mut list) => match list.iter().position(|entry| entry.id == handler_id) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            // Drop names whose last handler just left
            self.handlers.remove_if(event_name, |_, list| list.is_empty());
            debug!(event_name, handler_id = %handler_id, "Handler removed");
        }

        removed
    }

    fn contains(&self, event_name: &str, handler_id: HandlerId) -> bool {
        self.handlers
            .get(event_name)
            .map(|list| list.iter().any(|entry| entry.id == handler_id))
            .unwrap_or(false)
    }

    fn handlers(&self, event_name: &str) -> Vec<HandlerEntry> {
        self.handlers
            .get(event_name)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    fn handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .get(event_name)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    fn event_names(&self) -> Vec<String> {
        self.handlers
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn total_handlers(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }

    fn clear(&self) {
        self.handlers.clear();
        debug!("Registry cleared");
    }
}
