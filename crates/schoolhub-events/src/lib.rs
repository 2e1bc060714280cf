//! # schoolhub-events
//!
//! In-process fan-out of [`DomainEvent`](schoolhub_core::events::DomainEvent)s
//! to handlers registered by event type. Publishing schedules every handler
//! as its own task and returns immediately; handler failures are logged and
//! counted, never propagated to the publisher.

pub mod bus;
pub mod handler;
pub mod metrics;
pub mod registry;

pub use bus::{EventBus, EventPublisher};
pub use handler::{EventHandler, FnHandler, TypedHandler, handler_fn};
pub use metrics::{BusMetrics, BusStats};
pub use registry::HandlerRegistry;
