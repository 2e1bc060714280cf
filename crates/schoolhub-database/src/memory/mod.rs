//! In-memory document store.
//!
//! Used when `database.provider = "memory"` and in tests. Behaves like the
//! PostgreSQL repositories: same unique keys, same ordering, same
//! not-found and conflict errors.

pub mod collection;
pub mod installed_plugin;
pub mod plugin;

pub use collection::DocumentCollection;
pub use installed_plugin::MemoryInstalledPluginRepository;
pub use plugin::MemoryPluginRepository;
