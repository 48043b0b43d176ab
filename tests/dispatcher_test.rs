use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_dispatcher::{
    Completion, Error, Event, EventDispatcher, EventEnvelope, EventHandler, FunctionHandler,
    HandlerId,
};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[derive(Debug)]
struct TestEvent {
    name: String,
    payload: String,
    created_at: DateTime<Utc>,
}

impl TestEvent {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            payload: format!("{name} payload"),
            created_at: Utc::now(),
        }
    }
}

impl Event for TestEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &(dyn Any + Send + Sync) {
        &self.payload
    }

    fn date_time(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Default)]
struct TestHandler {
    calls: AtomicUsize,
}

impl TestHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for TestHandler {
    async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        done.done();
    }
}

/// Signals from a separate task after `handle` has already returned
struct DeferredHandler {
    delay: Duration,
    signaled: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler for DeferredHandler {
    async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
        let delay = self.delay;
        let signaled = self.signaled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            signaled.fetch_add(1, Ordering::SeqCst);
            done.done();
        });
    }
}

struct PanickingHandler;

#[async_trait]
impl EventHandler for PanickingHandler {
    async fn handle(&self, _event: Arc<dyn Event>, _done: Completion) {
        panic!("handler exploded");
    }
}

struct ForgetfulHandler;

#[async_trait]
impl EventHandler for ForgetfulHandler {
    async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
        drop(done);
    }
}

struct SlowHandler;

#[async_trait]
impl EventHandler for SlowHandler {
    async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
        tokio::time::sleep(Duration::from_secs(30)).await;
        done.done();
    }
}

#[test]
fn test_register_twice_is_rejected() {
    let dispatcher = EventDispatcher::new();
    let handler = TestHandler::new();

    dispatcher.register("test", handler.clone()).unwrap();
    let err = dispatcher.register("test", handler.clone()).unwrap_err();

    assert!(err.is_already_registered());
    assert_eq!(
        err,
        Error::HandlerAlreadyRegistered {
            event_name: "test".to_string(),
            handler_id: HandlerId::of(&handler),
        }
    );
    assert_eq!(dispatcher.handler_count("test"), 1);
}

#[test]
fn test_registration_order_is_preserved() {
    let dispatcher = EventDispatcher::new();
    let h1 = TestHandler::new();
    let h2 = TestHandler::new();

    let id1 = dispatcher.register("test", h1.clone()).unwrap();
    let id2 = dispatcher.register("test", h2.clone()).unwrap();
    assert_eq!(dispatcher.handler_ids("test"), vec![id1, id2]);

    assert!(dispatcher.remove("test", &h1));
    assert_eq!(dispatcher.handler_ids("test"), vec![id2]);
}

#[test]
fn test_has_reflects_membership() {
    let dispatcher = EventDispatcher::new();
    let h1 = TestHandler::new();
    let h2 = TestHandler::new();

    dispatcher.register("test", h1.clone()).unwrap();

    assert!(dispatcher.has("test", &h1));
    assert!(!dispatcher.has("test", &h2));
    assert!(!dispatcher.has("other", &h1));

    dispatcher.remove("test", &h1);
    assert!(!dispatcher.has("test", &h1));
}

#[test]
fn test_has_accepts_trait_object_handles() {
    let dispatcher = EventDispatcher::new();
    let concrete = TestHandler::new();
    let erased: Arc<dyn EventHandler> = concrete.clone();

    dispatcher.register("test", erased.clone()).unwrap();

    assert!(dispatcher.has("test", &concrete));
    assert!(dispatcher.has("test", &erased));
    assert!(dispatcher.register("test", concrete).is_err());
}

#[test]
fn test_clear_empties_all_names() {
    let dispatcher = EventDispatcher::new();
    let h1 = TestHandler::new();
    let h2 = TestHandler::new();

    dispatcher.register("a", h1.clone()).unwrap();
    dispatcher.register("b", h2.clone()).unwrap();
    dispatcher.register("b", h1.clone()).unwrap();

    dispatcher.clear();

    assert!(!dispatcher.has("a", &h1));
    assert!(!dispatcher.has("b", &h1));
    assert!(!dispatcher.has("b", &h2));
    assert_eq!(dispatcher.handler_count("a"), 0);
    assert_eq!(dispatcher.handler_count("b"), 0);
    assert!(dispatcher.event_names().is_empty());
}

#[test]
fn test_remove_absent_is_noop() {
    let dispatcher = EventDispatcher::new();
    let registered = TestHandler::new();
    let stranger = TestHandler::new();

    dispatcher.register("test", registered.clone()).unwrap();

    assert!(!dispatcher.remove("unknown", &registered));
    assert!(!dispatcher.remove("test", &stranger));
    assert_eq!(dispatcher.handler_ids("test"), vec![HandlerId::of(&registered)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispatch_invokes_each_handler_once() {
    let dispatcher = EventDispatcher::new();
    let h1 = TestHandler::new();
    let h2 = TestHandler::new();

    dispatcher.register("test", h1.clone()).unwrap();
    dispatcher.register("test", h2.clone()).unwrap();

    let report = dispatcher.dispatch(TestEvent::new("test")).await;

    assert_eq!(h1.calls(), 1);
    assert_eq!(h2.calls(), 1);
    assert_eq!(report.handlers, 2);
    assert!(report.is_clean());

    // Dispatch never removes registrations
    assert!(dispatcher.has("test", &h1));
    assert!(dispatcher.has("test", &h2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handlers_run_concurrently() {
    // Each handler waits for all the others; sequential execution would hang.
    struct Rendezvous(Arc<Barrier>);

    #[async_trait]
    impl EventHandler for Rendezvous {
        async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
            self.0.wait().await;
            done.done();
        }
    }

    let dispatcher = EventDispatcher::new();
    let barrier = Arc::new(Barrier::new(3));
    for _ in 0..3 {
        dispatcher
            .register("meet", Arc::new(Rendezvous(barrier.clone())))
            .unwrap();
    }

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(EventEnvelope::new("meet", ())),
    )
    .await
    .expect("handlers should run concurrently");

    assert_eq!(report.signaled, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatch_waits_for_deferred_signal() {
    let dispatcher = EventDispatcher::new();
    let signaled = Arc::new(AtomicUsize::new(0));

    let handler = Arc::new(DeferredHandler {
        delay: Duration::from_millis(50),
        signaled: signaled.clone(),
    });
    dispatcher.register("later", handler).unwrap();

    let report = dispatcher.dispatch(TestEvent::new("later")).await;

    assert_eq!(signaled.load(Ordering::SeqCst), 1);
    assert_eq!(report.signaled, 1);
    assert!(report.elapsed >= Duration::from_millis(50));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_handler_is_isolated() {
    let dispatcher = EventDispatcher::new();
    let healthy = TestHandler::new();

    dispatcher.register("boom", Arc::new(PanickingHandler)).unwrap();
    dispatcher.register("boom", healthy.clone()).unwrap();

    let report = dispatcher.dispatch(TestEvent::new("boom")).await;

    assert_eq!(healthy.calls(), 1);
    assert_eq!(report.handlers, 2);
    assert_eq!(report.panicked, 1);
    assert_eq!(report.signaled, 1);
    assert!(!report.is_clean());
    assert_eq!(dispatcher.stats().handler_panics, 1);

    // The dispatcher stays usable
    let again = dispatcher.dispatch(TestEvent::new("boom")).await;
    assert_eq!(healthy.calls(), 2);
    assert_eq!(again.panicked, 1);
}

/// Hands its token to a worker thread that panics, then keeps running
struct HandOffHandler;

#[async_trait]
impl EventHandler for HandOffHandler {
    async fn handle(&self, _event: Arc<dyn Event>, done: Completion) {
        let worker = std::thread::spawn(move || {
            let _done = done;
            panic!("worker failed");
        });
        let _ = worker.join();

        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_token_dropped_by_worker_panic_releases_dispatch() {
    let dispatcher = EventDispatcher::new();
    dispatcher.register("handoff", Arc::new(HandOffHandler)).unwrap();

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(TestEvent::new("handoff")),
    )
    .await
    .expect("dispatch should not wait for the lingering handler");

    assert_eq!(report.unsignaled, 1);
    assert_eq!(report.signaled, 0);
    assert_eq!(report.panicked, 0);
    assert!(report.elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unsignaled_handler_does_not_hang() {
    let dispatcher = EventDispatcher::new();
    dispatcher.register("quiet", Arc::new(ForgetfulHandler)).unwrap();

    let report = dispatcher.dispatch(TestEvent::new("quiet")).await;

    assert_eq!(report.unsignaled, 1);
    assert_eq!(report.signaled, 0);
    assert_eq!(dispatcher.stats().unsignaled_completions, 1);
}

#[tokio::test]
async fn test_dispatch_timeout_reports_pending() {
    let dispatcher = EventDispatcher::new();
    let fast = TestHandler::new();

    dispatcher.register("slow", Arc::new(SlowHandler)).unwrap();
    dispatcher.register("slow", fast.clone()).unwrap();

    let err = dispatcher
        .dispatch_timeout(TestEvent::new("slow"), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(
        err,
        Error::DispatchTimeout {
            event_name: "slow".to_string(),
            pending: 1,
        }
    );
    assert_eq!(fast.calls(), 1);
    assert_eq!(dispatcher.stats().dispatch_timeouts, 1);
}

#[tokio::test]
async fn test_configured_deadline() {
    let dispatcher = EventDispatcher::builder()
        .configure(|c| c.dispatch_timeout(Duration::from_millis(20)))
        .build()
        .unwrap();
    dispatcher.register("slow", Arc::new(SlowHandler)).unwrap();

    let result = dispatcher.dispatch_with_deadline(TestEvent::new("slow")).await;
    assert!(matches!(result, Err(Error::DispatchTimeout { .. })));

    let report = dispatcher
        .dispatch_with_deadline(TestEvent::new("unhandled"))
        .await
        .unwrap();
    assert_eq!(report.handlers, 0);
}

#[tokio::test]
async fn test_handler_sees_event_payload() {
    let dispatcher = EventDispatcher::new();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();

    let handler = Arc::new(FunctionHandler::with_name(
        move |event: Arc<dyn Event>| {
            let sink = sink.clone();
            async move {
                if let Some(payload) = event.payload_ref::<String>() {
                    sink.lock().unwrap().push(payload.clone());
                }
            }
        },
        "recorder",
    ));
    dispatcher.register("user.created", handler).unwrap();

    dispatcher.dispatch(TestEvent::new("user.created")).await;
    dispatcher
        .dispatch(EventEnvelope::new("user.created", "alice".to_string()))
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["user.created payload".to_string(), "alice".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_operations_keep_table_consistent() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let handlers: Vec<_> = (0..16).map(|_| TestHandler::new()).collect();

    let tasks: Vec<_> = handlers
        .iter()
        .cloned()
        .map(|handler| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.register("shared", handler.clone()).unwrap();
                dispatcher.dispatch(TestEvent::new("shared")).await;
                assert!(dispatcher.has("shared", &handler));
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(dispatcher.handler_count("shared"), 16);
    for handler in &handlers {
        assert!(handler.calls() >= 1);
    }
}
