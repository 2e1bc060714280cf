//! # schoolhub-service
//!
//! Application use cases for SchoolHub. Services orchestrate repositories
//! and publish domain events after their primary write succeeds; listeners
//! in the consuming modules react to those events.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time. [`Platform`] wires everything together.

pub mod context;
pub mod listeners;
pub mod platform;
pub mod plugin;

pub use context::RequestContext;
pub use listeners::Listeners;
pub use platform::Platform;
pub use plugin::{ImportSummary, InstallationService, MarketplaceService, OutdatedPlugin};
