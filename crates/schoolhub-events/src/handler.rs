//! Event handler trait and closure adapters.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use schoolhub_core::error::{AppError, ErrorKind};
use schoolhub_core::events::{DomainEvent, EventKind};
use schoolhub_core::result::AppResult;

/// Reacts to a domain event.
///
/// Returning an error marks this invocation as failed; the bus logs it and
/// moves on.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: Arc<DomainEvent>) -> AppResult<()>;
}

/// Handler backed by an async closure over the full event.
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn handle(&self, event: Arc<DomainEvent>) -> AppResult<()> {
        (self.f)(event).await
    }
}

/// Handler that decodes the payload into `E` before calling the closure.
///
/// A payload that does not decode is a handler failure.
pub struct TypedHandler<E, F> {
    f: F,
    _payload: PhantomData<fn() -> E>,
}

impl<E, F> TypedHandler<E, F> {
    /// Wrap a typed async closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<E, F, Fut> EventHandler for TypedHandler<E, F>
where
    E: EventKind,
    F: Fn(Arc<DomainEvent>, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn handle(&self, event: Arc<DomainEvent>) -> AppResult<()> {
        let payload = event.payload_as::<E>().map_err(|e| {
            AppError::with_source(
                ErrorKind::HandlerFailure,
                format!("Undecodable '{}' payload", E::EVENT_TYPE),
                e,
            )
        })?;
        (self.f)(event, payload).await
    }
}
