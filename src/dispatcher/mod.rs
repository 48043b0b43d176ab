//! Event dispatcher routing named events to registered handlers.
//!
//! The dispatcher owns the registration table. `dispatch` snapshots the
//! handlers registered for the event's name, runs each one on its own Tokio
//! task and waits on a per-call [`CompletionBarrier`] until every handler
//! has released its [`Completion`].

use crate::handler::{EventHandler, HandlerId};
use crate::registry::{
    DashMapRegistry, HandlerEntry, HandlerRegistry, RegistryStatistics, RegistryStats,
};
use crate::{Error, Event, Result};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

pub mod barrier;
pub mod builder;
pub mod config;

pub use barrier::{BarrierSummary, Completion, CompletionBarrier};
pub use builder::EventDispatcherBuilder;
pub use config::DispatcherConfig;

/// Registry of named event handlers with concurrent fan-out dispatch.
///
/// # Example
///
/// ```rust
/// use event_dispatcher::{Event, EventDispatcher, EventEnvelope, FunctionHandler};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> event_dispatcher::Result<()> {
/// let dispatcher = EventDispatcher::new();
///
/// let greeter = Arc::new(FunctionHandler::new(|event: Arc<dyn Event>| async move {
///     println!("hello from {}", event.name());
/// }));
/// dispatcher.register("greet", greeter.clone())?;
///
/// let report = dispatcher.dispatch(EventEnvelope::new("greet", ())).await;
/// assert_eq!(report.handlers, 1);
/// assert!(dispatcher.has("greet", &greeter));
/// # Ok(())
/// # }
/// ```
pub struct EventDispatcher {
    config: DispatcherConfig,
    registry: Arc<dyn HandlerRegistry>,
    counters: Arc<Counters>,
}

impl EventDispatcher {
    /// Create an empty dispatcher with the default configuration
    pub fn new() -> Self {
        let config = DispatcherConfig::default();
        let registry = Arc::new(DashMapRegistry::with_capacity(config.initial_capacity));
        Self::from_parts(config, registry)
    }

    /// Create a new dispatcher builder
    pub fn builder() -> EventDispatcherBuilder {
        EventDispatcherBuilder::new()
    }

    pub(crate) fn from_parts(config: DispatcherConfig, registry: Arc<dyn HandlerRegistry>) -> Self {
        Self {
            config,
            registry,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Register `handler` for `event_name`.
    ///
    /// Fails with [`Error::HandlerAlreadyRegistered`] if this exact instance
    /// is already registered under the name; the table is left unchanged.
    pub fn register(
        &self,
        event_name: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<HandlerId> {
        let event_name = event_name.into();
        let entry = HandlerEntry::new(handler);
        let handler_id = entry.id;

        self.registry.register(&event_name, entry)?;
        Ok(handler_id)
    }

    /// Remove `handler` from `event_name`.
    ///
    /// Unknown names and handlers are a no-op. Returns whether an entry was
    /// removed.
    pub fn remove<H>(&self, event_name: &str, handler: &Arc<H>) -> bool
    where
        H: EventHandler + ?Sized,
    {
        self.remove_id(event_name, HandlerId::of(handler))
    }

    /// Remove a handler by its id.
    ///
    /// A [`HandlerId`] is an allocation address. An id kept after its handler
    /// was removed and dropped may match a handler registered later at the
    /// same address, which this call would then remove. Prefer
    /// [`remove`](Self::remove) with the handler itself.
    pub fn remove_id(&self, event_name: &str, handler_id: HandlerId) -> bool {
        self.registry.remove(event_name, handler_id)
    }

    /// Check whether `handler` is registered for `event_name`
    pub fn has<H>(&self, event_name: &str, handler: &Arc<H>) -> bool
    where
        H: EventHandler + ?Sized,
    {
        self.registry.contains(event_name, HandlerId::of(handler))
    }

    /// Remove every registration for every event name
    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Handler ids for `event_name`, in registration order
    pub fn handler_ids(&self, event_name: &str) -> Vec<HandlerId> {
        self.registry
            .handlers(event_name)
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of handlers registered for `event_name`
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.registry.handler_count(event_name)
    }

    /// Event names with at least one handler
    pub fn event_names(&self) -> Vec<String> {
        self.registry.event_names()
    }

    /// Total registrations across all event names
    pub fn total_handlers(&self) -> usize {
        self.registry.total_handlers()
    }

    /// Whether no handler is registered at all
    pub fn is_empty(&self) -> bool {
        self.total_handlers() == 0
    }

    /// The active configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatch `event` to every handler registered under its name and wait
    /// for all of them to signal completion.
    pub async fn dispatch<E: Event>(&self, event: E) -> DispatchReport {
        self.dispatch_shared(Arc::new(event)).await
    }

    /// Dispatch an already shared event
    pub async fn dispatch_shared(&self, event: Arc<dyn Event>) -> DispatchReport {
        match self.fan_out(event) {
            Ok(in_flight) => {
                in_flight.barrier.wait().await;
                self.settle(in_flight)
            }
            Err(report) => report,
        }
    }

    /// Dispatch and wait at most `timeout` for handlers to complete.
    ///
    /// On expiry returns [`Error::DispatchTimeout`]; handlers that are still
    /// running are not cancelled.
    pub async fn dispatch_timeout<E: Event>(
        &self,
        event: E,
        timeout: Duration,
    ) -> Result<DispatchReport> {
        let in_flight = match self.fan_out(Arc::new(event)) {
            Ok(in_flight) => in_flight,
            Err(report) => return Ok(report),
        };

        let finished = tokio::time::timeout(timeout, in_flight.barrier.wait())
            .await
            .is_ok();
        if finished {
            return Ok(self.settle(in_flight));
        }

        let pending = in_flight.barrier.remaining();
        self.counters.dispatch_timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            event_name = %in_flight.event_name,
            pending,
            timeout_ms = timeout.as_millis() as u64,
            "Dispatch timed out waiting for handlers"
        );
        Err(Error::DispatchTimeout {
            event_name: in_flight.event_name,
            pending,
        })
    }

    /// Dispatch using the configured deadline, if any
    pub async fn dispatch_with_deadline<E: Event>(&self, event: E) -> Result<DispatchReport> {
        match self.config.dispatch_timeout {
            Some(timeout) => self.dispatch_timeout(event, timeout).await,
            None => Ok(self.dispatch(event).await),
        }
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStats {
        self.counters.snapshot()
    }

    /// Shape of the registration table
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.as_ref().stats()
    }

    /// Spawn one task per registered handler, or report that there were none
    fn fan_out(&self, event: Arc<dyn Event>) -> std::result::Result<InFlight, DispatchReport> {
        let event_name = event.name().to_owned();
        let handlers = self.registry.handlers(&event_name);

        if handlers.is_empty() {
            self.counters.events_unhandled.fetch_add(1, Ordering::Relaxed);
            if self.config.enable_tracing {
                trace!(event_name = %event_name, "No handlers registered for event");
            }
            return Err(DispatchReport::empty(event_name));
        }

        if self.config.enable_tracing {
            debug!(
                event_name = %event_name,
                handler_count = handlers.len(),
                "Dispatching event"
            );
        }

        let started = Instant::now();
        let barrier = CompletionBarrier::new(handlers.len());

        for entry in &handlers {
            let (completion, guard) = barrier.invocation();
            let handler = entry.handler.clone();
            let handler_id = entry.id;
            let event = event.clone();
            let counters = self.counters.clone();

            self.counters.handler_invocations.fetch_add(1, Ordering::Relaxed);

            tokio::spawn(async move {
                guard.bind_current_task();
                let mut invocation = handler.handle(event, completion);

                // Poll through a reference so the panic is recorded before the
                // invocation, and any token it still owns, is dropped.
                let outcome = AssertUnwindSafe(&mut invocation).catch_unwind().await;
                if let Err(panic) = outcome {
                    guard.record_panic();
                    counters.handler_panics.fetch_add(1, Ordering::Relaxed);
                    error!(
                        handler_id = %handler_id,
                        handler_name = handler.name(),
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }

                drop(invocation);
                guard.finish();
            });
        }

        Ok(InFlight {
            event_name,
            handlers: handlers.len(),
            barrier,
            started,
        })
    }

    /// Build the report for a dispatch whose barrier reached zero
    fn settle(&self, in_flight: InFlight) -> DispatchReport {
        let elapsed = in_flight.started.elapsed();
        let summary = in_flight.barrier.summary();

        self.counters.events_dispatched.fetch_add(1, Ordering::Relaxed);
        self.counters
            .unsignaled_completions
            .fetch_add(summary.unsignaled as u64, Ordering::Relaxed);
        self.counters
            .total_dispatch_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        if summary.unsignaled > 0 {
            warn!(
                event_name = %in_flight.event_name,
                unsignaled = summary.unsignaled,
                panicked = summary.panicked,
                "Handlers finished without signaling completion"
            );
        }

        if self.config.enable_tracing {
            debug!(
                event_name = %in_flight.event_name,
                handler_count = in_flight.handlers,
                elapsed_us = elapsed.as_micros() as u64,
                "Event dispatched"
            );
        }

        DispatchReport {
            event_name: in_flight.event_name,
            handlers: in_flight.handlers,
            signaled: summary.signaled,
            unsignaled: summary.unsignaled,
            panicked: summary.panicked,
            elapsed,
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

/// A dispatch whose handlers have been spawned
struct InFlight {
    event_name: String,
    handlers: usize,
    barrier: CompletionBarrier,
    started: Instant,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Outcome of a single dispatch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Name of the dispatched event
    pub event_name: String,

    /// Handlers invoked
    pub handlers: usize,

    /// Handlers that called [`Completion::done`]
    pub signaled: usize,

    /// Handlers whose completion was dropped without being signaled
    pub unsignaled: usize,

    /// Handlers that panicked before the dispatch finished
    pub panicked: usize,

    /// Time from fan-out until the last completion
    pub elapsed: Duration,
}

impl DispatchReport {
    fn empty(event_name: String) -> Self {
        Self {
            event_name,
            handlers: 0,
            signaled: 0,
            unsignaled: 0,
            panicked: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Whether every invoked handler signaled and none panicked
    pub fn is_clean(&self) -> bool {
        self.unsignaled == 0 && self.panicked == 0 && self.signaled == self.handlers
    }
}

#[derive(Debug, Default)]
struct Counters {
    events_dispatched: AtomicU64,
    events_unhandled: AtomicU64,
    handler_invocations: AtomicU64,
    handler_panics: AtomicU64,
    unsignaled_completions: AtomicU64,
    dispatch_timeouts: AtomicU64,
    total_dispatch_time_us: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DispatcherStats {
        let events_dispatched = self.events_dispatched.load(Ordering::Relaxed);
        let total_time = self.total_dispatch_time_us.load(Ordering::Relaxed);

        DispatcherStats {
            events_dispatched,
            events_unhandled: self.events_unhandled.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            unsignaled_completions: self.unsignaled_completions.load(Ordering::Relaxed),
            dispatch_timeouts: self.dispatch_timeouts.load(Ordering::Relaxed),
            avg_dispatch_time_us: if events_dispatched > 0 {
                total_time / events_dispatched
            } else {
                0
            },
        }
    }
}

/// Statistics for the event dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Dispatches that ran at least one handler to completion
    pub events_dispatched: u64,

    /// Dispatches that found no handlers
    pub events_unhandled: u64,

    /// Handler tasks spawned
    pub handler_invocations: u64,

    /// Handler invocations that panicked
    pub handler_panics: u64,

    /// Completions dropped without being signaled
    pub unsignaled_completions: u64,

    /// Dispatches that hit their deadline
    pub dispatch_timeouts: u64,

    /// Average time until the last completion, in microseconds
    pub avg_dispatch_time_us: u64,
}

impl fmt::Display for DispatcherStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dispatched: {}, Unhandled: {}, Invocations: {}, Panics: {}, Avg time: {}us",
            self.events_dispatched,
            self.events_unhandled,
            self.handler_invocations,
            self.handler_panics,
            self.avg_dispatch_time_us
        )
    }
}
