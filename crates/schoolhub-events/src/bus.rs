//! Event bus: schedules every registered handler for a published event as
//! an independent task.
//!
//! - Publishing never waits for handlers and never sees their results.
//! - Each invocation is isolated: an error, a panic or a timeout in one
//!   handler is logged and counted, and does not affect the others.
//! - No ordering is guaranteed between handlers of the same event.
//!
//! Publishing must happen inside a Tokio runtime.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};

use schoolhub_core::config::EventBusConfig;
use schoolhub_core::events::{DomainEvent, EventKind, EventMetadata};
use schoolhub_core::result::AppResult;

use crate::handler::{EventHandler, TypedHandler};
use crate::metrics::{BusMetrics, BusStats};
use crate::registry::HandlerRegistry;

/// In-process domain event bus. Cheap to clone; clones share handlers,
/// counters and in-flight tasks.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Debug)]
struct BusInner {
    registry: HandlerRegistry,
    metrics: Arc<BusMetrics>,
    tracker: TaskTracker,
    handler_timeout: Option<Duration>,
    accepting: AtomicBool,
    /// Serializes reopening the tracker against shutdown closing it.
    lifecycle: Mutex<()>,
}

impl EventBus {
    /// Create a bus from configuration.
    pub fn new(config: &EventBusConfig) -> Self {
        Self::with_handler_timeout(config.handler_timeout())
    }

    /// Create a bus with an explicit per-handler timeout (`None` disables it).
    pub fn with_handler_timeout(handler_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: HandlerRegistry::new(),
                metrics: Arc::new(BusMetrics::new()),
                tracker: TaskTracker::new(),
                handler_timeout,
                accepting: AtomicBool::new(true),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    /// Register a handler receiving the full event.
    pub fn on_event<H>(&self, event_type: impl Into<String>, module: impl Into<String>, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.inner.registry.register(event_type, module, Arc::new(handler));
    }

    /// Register a typed handler for a catalog event. The payload is decoded
    /// to `E` before `f` runs.
    pub fn on<E, F, Fut>(&self, module: impl Into<String>, f: F)
    where
        E: EventKind,
        F: Fn(Arc<DomainEvent>, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        self.on_event(E::EVENT_TYPE, module, TypedHandler::<E, F>::new(f));
    }

    /// Build and dispatch a raw event. Returns the number of handlers
    /// scheduled.
    pub fn publish(&self, event_type: impl Into<String>, metadata: EventMetadata, payload: Value) -> usize {
        self.inner.dispatch(DomainEvent::new(event_type, metadata, payload))
    }

    /// Dispatch a prebuilt event. Returns the number of handlers scheduled.
    pub fn publish_event(&self, event: DomainEvent) -> usize {
        self.inner.dispatch(event)
    }

    /// Build and dispatch a typed catalog event.
    pub fn publish_typed<E: EventKind>(&self, metadata: EventMetadata, payload: &E) -> AppResult<usize> {
        let event = DomainEvent::typed(metadata, payload)?;
        Ok(self.inner.dispatch(event))
    }

    /// A handle for publishing that does not keep the bus alive. Handlers
    /// that publish follow-up events hold one of these.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    /// Snapshot of dispatch counters.
    pub fn stats(&self) -> BusStats {
        self.inner.metrics.snapshot()
    }

    /// Handler invocations still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait until every scheduled handler, including those scheduled while
    /// waiting, has finished. A shutdown that starts meanwhile keeps the
    /// bus closed.
    pub async fn wait_idle(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;

        let _guard = self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if self.inner.accepting.load(Ordering::Acquire) {
            tracker.reopen();
        }
    }

    /// Stop accepting events and wait up to `grace` for in-flight handlers.
    /// Returns `true` if everything finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let tracker = &self.inner.tracker;
        {
            let _guard = self.inner.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
            self.inner.accepting.store(false, Ordering::Release);
            tracker.close();
        }

        info!(
            in_flight = tracker.len(),
            grace_ms = grace.as_millis() as u64,
            "Shutting down event bus"
        );

        match tokio::time::timeout(grace, tracker.wait()).await {
            Ok(()) => {
                info!("Event bus drained");
                true
            }
            Err(_) => {
                warn!(
                    abandoned = tracker.len(),
                    "Event bus grace period elapsed with handlers still running"
                );
                false
            }
        }
    }
}

/// Weak publishing handle obtained from [`EventBus::publisher`].
#[derive(Debug, Clone)]
pub struct EventPublisher {
    inner: Weak<BusInner>,
}

impl EventPublisher {
    /// Dispatch a prebuilt event. Returns 0 if the bus is gone.
    pub fn publish_event(&self, event: DomainEvent) -> usize {
        match self.inner.upgrade() {
            Some(inner) => inner.dispatch(event),
            None => {
                warn!(event_type = %event.event_type(), "Event bus dropped, discarding event");
                0
            }
        }
    }

    /// Build and dispatch a typed catalog event.
    pub fn publish_typed<E: EventKind>(&self, metadata: EventMetadata, payload: &E) -> AppResult<usize> {
        let event = DomainEvent::typed(metadata, payload)?;
        Ok(self.publish_event(event))
    }
}

impl BusInner {
    fn dispatch(&self, event: DomainEvent) -> usize {
        if !self.accepting.load(Ordering::Acquire) {
            warn!(
                event_type = %event.event_type(),
                event_id = %event.event_id(),
                "Event bus is shut down, dropping event"
            );
            return 0;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            error!(
                event_type = %event.event_type(),
                "Event published outside a Tokio runtime, dropping event"
            );
            return 0;
        }

        BusMetrics::inc(&self.metrics.published);
        let handlers = self.registry.handlers_for(event.event_type());
        if handlers.is_empty() {
            BusMetrics::inc(&self.metrics.unrouted);
            debug!(event_type = %event.event_type(), "No handlers registered for event");
            return 0;
        }

        let event = Arc::new(event);
        let count = handlers.len();
        BusMetrics::add(&self.metrics.dispatched, count as u64);
        debug!(
            event_type = %event.event_type(),
            event_id = %event.event_id(),
            tenant_id = %event.tenant_id(),
            handler_count = count,
            "Dispatching event"
        );

        for entry in handlers {
            let span = info_span!(
                "event_handler",
                event_type = %event.event_type(),
                event_id = %event.event_id(),
                module = %entry.module,
            );
            let invocation = run_handler(
                entry.handler,
                Arc::clone(&event),
                Arc::clone(&self.metrics),
                self.handler_timeout,
            );
            self.tracker.spawn(invocation.instrument(span));
        }

        count
    }
}

async fn run_handler(
    handler: Arc<dyn EventHandler>,
    event: Arc<DomainEvent>,
    metrics: Arc<BusMetrics>,
    timeout: Option<Duration>,
) {
    let started = Instant::now();
    let invocation = AssertUnwindSafe(handler.handle(event)).catch_unwind();
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, invocation).await.ok(),
        None => Some(invocation.await),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Some(Ok(Ok(()))) => {
            BusMetrics::inc(&metrics.succeeded);
            debug!(elapsed_ms, "Event handler completed");
        }
        Some(Ok(Err(e))) => {
            BusMetrics::inc(&metrics.failed);
            warn!(error = %e, elapsed_ms, "Event handler failed");
        }
        Some(Err(panic)) => {
            BusMetrics::inc(&metrics.panicked);
            error!(panic = %panic_message(panic.as_ref()), elapsed_ms, "Event handler panicked");
        }
        None => {
            BusMetrics::inc(&metrics.timed_out);
            error!(elapsed_ms, "Event handler timed out");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
