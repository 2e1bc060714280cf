//! Handler registry: event type → handlers, in registration order.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::handler::EventHandler;

/// A registered handler and the module that owns it.
#[derive(Clone)]
pub struct HandlerEntry {
    /// Owning module, used in logs.
    pub module: String,
    /// The handler.
    pub handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Registry of event handlers organized by event type.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Vec<HandlerEntry>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an event type.
    pub fn register(
        &self,
        event_type: impl Into<String>,
        module: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) {
        let event_type = event_type.into();
        let module = module.into();
        info!(event_type = %event_type, module = %module, "Event handler registered");
        self.handlers
            .entry(event_type)
            .or_default()
            .push(HandlerEntry { module, handler });
    }

    /// Handlers registered for an event type.
    pub fn handlers_for(&self, event_type: &str) -> Vec<HandlerEntry> {
        self.handlers
            .get(event_type)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Number of handlers registered for an event type.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .get(event_type)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Event types with at least one handler, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use schoolhub_core::error::AppError;

    #[test]
    fn test_register_keeps_order() {
        let registry = HandlerRegistry::new();
        registry.register("fee.assigned", "notifications", Arc::new(handler_fn(|_| async { Ok::<(), AppError>(()) })));
        registry.register("fee.assigned", "audit", Arc::new(handler_fn(|_| async { Ok::<(), AppError>(()) })));
        registry.register("student.enrolled", "fees", Arc::new(handler_fn(|_| async { Ok::<(), AppError>(()) })));

        let modules: Vec<String> = registry
            .handlers_for("fee.assigned")
            .into_iter()
            .map(|e| e.module)
            .collect();
        assert_eq!(modules, vec!["notifications", "audit"]);
        assert_eq!(registry.handler_count("student.enrolled"), 1);
        assert_eq!(registry.handler_count("library.book_overdue"), 0);
        assert_eq!(registry.event_types(), vec!["fee.assigned", "student.enrolled"]);
    }
}
