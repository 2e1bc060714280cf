//! Generic repository traits for document storage.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::TenantId;

/// Generic upsert-style repository over a global document collection.
///
/// Entity-specific query methods are defined on traits extending this one
/// next to their implementations.
#[async_trait]
pub trait DocumentRepository<Entity, Id>: Send + Sync + 'static
where
    Entity: Send + Sync + 'static,
    Id: Send + Sync + 'static,
{
    /// Return every readable document. Records that fail to decode are
    /// skipped rather than failing the whole listing.
    async fn find_all(&self) -> AppResult<Vec<Entity>>;

    /// Find a document by its storage-assigned identity.
    async fn find_by_id(&self, id: &Id) -> AppResult<Option<Entity>>;

    /// Insert (no identity) or replace (identity present) a document and
    /// return the persisted representation. Replacing a missing identity is
    /// a `NotFound` error.
    async fn save(&self, entity: Entity) -> AppResult<Entity>;

    /// Delete a document. Idempotent; returns `true` if something was removed.
    async fn delete(&self, id: &Id) -> AppResult<bool>;
}

/// Generic upsert-style repository whose documents belong to a tenant.
///
/// Every read and delete is filtered by tenant, so a caller scoped to one
/// tenant can never observe or remove another tenant's documents.
#[async_trait]
pub trait TenantScopedRepository<Entity, Id>: Send + Sync + 'static
where
    Entity: Send + Sync + 'static,
    Id: Send + Sync + 'static,
{
    /// Return every document owned by the tenant.
    async fn find_all(&self, tenant_id: &TenantId) -> AppResult<Vec<Entity>>;

    /// Find a document by identity within the tenant.
    async fn find_by_id(&self, id: &Id, tenant_id: &TenantId) -> AppResult<Option<Entity>>;

    /// Insert or replace a document. The tenant is taken from the entity.
    async fn save(&self, entity: Entity) -> AppResult<Entity>;

    /// Delete a document within the tenant. Idempotent; a wrong tenant is a
    /// no-op.
    async fn delete(&self, id: &Id, tenant_id: &TenantId) -> AppResult<bool>;
}
