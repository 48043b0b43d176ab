//! Closure-backed event handler.

use super::EventHandler;
use crate::dispatcher::Completion;
use crate::Event;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A function-based event handler using closures.
///
/// Completion is signaled when the returned future resolves.
pub struct FunctionHandler<F> {
    function: F,
    name: String,
}

impl<F, Fut> FunctionHandler<F>
where
    F: Fn(Arc<dyn Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Create a new function handler
    pub fn new(function: F) -> Self {
        Self {
            function,
            name: "FunctionHandler".to_string(),
        }
    }

    /// Create a new function handler with a custom name
    pub fn with_name(function: F, name: impl Into<String>) -> Self {
        Self {
            function,
            name: name.into(),
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FunctionHandler<F>
where
    F: Fn(Arc<dyn Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: Arc<dyn Event>, done: Completion) {
        (self.function)(event).await;
        done.done();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FunctionHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionHandler")
            .field("name", &self.name)
            .finish()
    }
}
