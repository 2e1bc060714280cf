//! Marketplace plugin catalog and per-tenant installation entities.

pub mod installed;
pub mod manifest;
pub mod model;
pub mod settings;
pub mod status;

pub use installed::InstalledPlugin;
pub use manifest::{MenuItem, PluginManifest};
pub use model::{ChangelogEntry, Plugin};
pub use status::{CatalogStatus, InstallStatus};
