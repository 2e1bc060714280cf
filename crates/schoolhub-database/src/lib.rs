//! # schoolhub-database
//!
//! Document store access for the plugin catalog and per-tenant
//! installations: repository traits, PostgreSQL (JSONB) implementations,
//! an in-memory document store, and provider selection.

pub mod connection;
pub mod error;
pub mod memory;
pub mod migration;
pub mod provider;
pub mod repositories;
pub mod search;

pub use connection::DatabasePool;
pub use provider::Repositories;
pub use repositories::{InstalledPluginRepository, PluginCatalogRepository};
