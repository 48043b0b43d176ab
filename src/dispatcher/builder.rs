//! Builder pattern for constructing EventDispatcher instances.

use super::{DispatcherConfig, EventDispatcher};
use crate::registry::{DashMapRegistry, HandlerRegistry};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Builder for creating EventDispatcher instances
#[derive(Debug, Default)]
pub struct EventDispatcherBuilder {
    config: DispatcherConfig,
    registry: Option<Arc<dyn HandlerRegistry>>,
}

impl EventDispatcherBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom configuration
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure the dispatcher
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DispatcherConfig) -> DispatcherConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Use a custom registry implementation
    pub fn registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the EventDispatcher
    pub fn build(self) -> Result<EventDispatcher> {
        self.config.validate()?;

        let registry: Arc<dyn HandlerRegistry> = match self.registry {
            Some(registry) => {
                info!("Using custom handler registry");
                registry
            }
            None => Arc::new(DashMapRegistry::with_capacity(self.config.initial_capacity)),
        };

        if self.config.enable_tracing {
            info!(
                dispatch_timeout = ?self.config.dispatch_timeout,
                "EventDispatcher built"
            );
        }

        Ok(EventDispatcher::from_parts(self.config, registry))
    }
}
