//! Per-dispatch completion barrier.
//!
//! A [`CompletionBarrier`] is a countdown latch created for a single
//! dispatch call and initialised to the number of invoked handlers. Each
//! handler receives a [`Completion`] token; signaling or dropping the token
//! counts the barrier down by one. [`CompletionBarrier::wait`] resolves once
//! the count reaches zero.

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task;
use tracing::warn;

/// Invocation is still being polled by the dispatcher
const INVOKING: u8 = 0;
/// Token was dropped during a panic while the invocation was being polled
const DEFERRED: u8 = 1;
/// Invocation finished; any later token drop releases directly
const FINISHED: u8 = 2;

/// Per-invocation state shared by a token and its guard
#[derive(Debug)]
struct Slot {
    phase: AtomicU8,
    /// Task polling the handler future, once it has started
    task: OnceCell<task::Id>,
}

impl Slot {
    fn new() -> Self {
        Self {
            phase: AtomicU8::new(INVOKING),
            task: OnceCell::new(),
        }
    }

    /// Whether the caller runs inside the task polling this invocation
    fn is_invoking_task(&self) -> bool {
        match (self.task.get(), task::try_id()) {
            (Some(owner), Some(current)) => *owner == current,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Signaled,
    Unsignaled,
}

#[derive(Debug)]
struct BarrierState {
    remaining: AtomicUsize,
    signaled: AtomicUsize,
    unsignaled: AtomicUsize,
    panicked: AtomicUsize,
    overflows: AtomicUsize,
    notify: Notify,
}

impl BarrierState {
    fn release(&self, kind: Release) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(count) => {
                match kind {
                    Release::Signaled => self.signaled.fetch_add(1, Ordering::Relaxed),
                    Release::Unsignaled => self.unsignaled.fetch_add(1, Ordering::Relaxed),
                };
                if count == 1 {
                    self.notify.notify_waiters();
                }
            }
            Err(_) => {
                self.overflows.fetch_add(1, Ordering::Relaxed);
                warn!("Completion released on a barrier that already reached zero");
            }
        }
    }
}

/// Countdown latch scoped to one dispatch call.
#[derive(Clone)]
pub struct CompletionBarrier {
    state: Arc<BarrierState>,
}

impl CompletionBarrier {
    /// Create a barrier expecting `count` completions
    pub fn new(count: usize) -> Self {
        Self {
            state: Arc::new(BarrierState {
                remaining: AtomicUsize::new(count),
                signaled: AtomicUsize::new(0),
                unsignaled: AtomicUsize::new(0),
                panicked: AtomicUsize::new(0),
                overflows: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// Hand out a completion token bound to this barrier
    pub fn completion(&self) -> Completion {
        Completion {
            state: Some(self.state.clone()),
            slot: None,
        }
    }

    /// Token plus the dispatcher-side guard used to attribute panics
    pub(crate) fn invocation(&self) -> (Completion, InvocationGuard) {
        let slot = Arc::new(Slot::new());
        let completion = Completion {
            state: Some(self.state.clone()),
            slot: Some(slot.clone()),
        };
        let guard = InvocationGuard {
            state: self.state.clone(),
            slot,
        };
        (completion, guard)
    }

    /// Completions still outstanding
    pub fn remaining(&self) -> usize {
        self.state.remaining.load(Ordering::Acquire)
    }

    /// Whether the count has reached zero
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait until every expected completion has been released
    pub async fn wait(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a release between the
            // check and the await is not missed.
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }

            notified.await;
        }
    }

    /// Counters observed so far
    pub fn summary(&self) -> BarrierSummary {
        BarrierSummary {
            remaining: self.remaining(),
            signaled: self.state.signaled.load(Ordering::Relaxed),
            unsignaled: self.state.unsignaled.load(Ordering::Relaxed),
            panicked: self.state.panicked.load(Ordering::Relaxed),
            overflows: self.state.overflows.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("summary", &self.summary())
            .finish()
    }
}

/// Snapshot of a barrier's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierSummary {
    /// Completions still outstanding
    pub remaining: usize,
    /// Tokens released through [`Completion::done`]
    pub signaled: usize,
    /// Tokens dropped without being signaled
    pub unsignaled: usize,
    /// Invocations that panicked
    pub panicked: usize,
    /// Releases ignored because the count was already zero
    pub overflows: usize,
}

/// Completion signal handed to a handler for one dispatch.
///
/// Consumed by [`Completion::done`], so a token can only be signaled once.
/// Dropping it without signaling releases the barrier as well, so a handler
/// that forgets to signal or panics never blocks the dispatch forever.
#[must_use = "dropping a Completion without calling `done` is reported as unsignaled"]
pub struct Completion {
    state: Option<Arc<BarrierState>>,
    slot: Option<Arc<Slot>>,
}

impl Completion {
    /// Signal that the handler has finished
    pub fn done(mut self) {
        if let Some(state) = self.state.take() {
            state.release(Release::Signaled);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        // Only a panic unwinding the invoking task itself is deferred; that
        // task releases once the panic is recorded. Drops on other threads or
        // tasks release right away.
        if std::thread::panicking() {
            if let Some(slot) = self.slot.as_ref().filter(|slot| slot.is_invoking_task()) {
                if slot
                    .phase
                    .compare_exchange(INVOKING, DEFERRED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return;
                }
            }
        }

        state.release(Release::Unsignaled);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.state.is_some())
            .finish()
    }
}

/// Dispatcher-side view of one handler invocation.
#[derive(Debug)]
pub(crate) struct InvocationGuard {
    state: Arc<BarrierState>,
    slot: Arc<Slot>,
}

impl InvocationGuard {
    /// Bind the invocation to the current task; call first thing in the task
    pub(crate) fn bind_current_task(&self) {
        if let Some(id) = task::try_id() {
            let _ = self.slot.task.set(id);
        }
    }

    /// Count a panic; call before the invocation future is dropped
    pub(crate) fn record_panic(&self) {
        self.state.panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the invocation finished, releasing a token deferred by a panic
    pub(crate) fn finish(self) {
        if self.slot.phase.swap(FINISHED, Ordering::AcqRel) == DEFERRED {
            self.state.release(Release::Unsignaled);
        }
    }
}
