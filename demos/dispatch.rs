use async_trait::async_trait;
use event_dispatcher::{
    global, Completion, Event, EventDispatcher, EventEnvelope, EventHandler, FunctionHandler,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct UserRegistered {
    email: String,
}

/// Finishes its work on a background task and signals from there
struct SendWelcomeEmail;

#[async_trait]
impl EventHandler for SendWelcomeEmail {
    async fn handle(&self, event: Arc<dyn Event>, done: Completion) {
        let Some(user) = event.payload_ref::<UserRegistered>().cloned() else {
            done.done();
            return;
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            println!("📧 Welcome email sent to {}", user.email);
            done.done();
        });
    }

    fn name(&self) -> &str {
        "send-welcome-email"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Testing event-dispatcher...\n");

    let dispatcher = global::init(
        EventDispatcher::builder()
            .configure(|c| c.dispatch_timeout(Duration::from_secs(2)))
            .build()?,
    )?;

    let welcome = Arc::new(SendWelcomeEmail);
    let audit = Arc::new(FunctionHandler::with_name(
        |event: Arc<dyn Event>| async move {
            println!("📝 Audit: {} at {}", event.name(), event.date_time());
        },
        "audit-log",
    ));

    dispatcher.register("user.registered", welcome.clone())?;
    dispatcher.register("user.registered", audit.clone())?;

    if let Err(err) = dispatcher.register("user.registered", welcome.clone()) {
        println!("⚠️  {err}");
    }

    println!("Dispatching events...");
    for email in ["ada@example.com", "grace@example.com"] {
        let event = EventEnvelope::new(
            "user.registered",
            UserRegistered {
                email: email.to_string(),
            },
        );
        let report = global::dispatcher()?.dispatch_with_deadline(event).await?;
        println!(
            "✔ {} handled by {} handlers in {:?}",
            report.event_name, report.handlers, report.elapsed
        );
    }

    dispatcher.remove("user.registered", &welcome);
    println!(
        "\nStill registered: welcome={}, audit={}",
        dispatcher.has("user.registered", &welcome),
        dispatcher.has("user.registered", &audit)
    );

    dispatcher.clear();
    println!("{}", dispatcher.stats());

    println!("\n✅ Demo completed successfully!");
    Ok(())
}
