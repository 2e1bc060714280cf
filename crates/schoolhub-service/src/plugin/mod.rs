//! Plugin marketplace and per-tenant installation use cases.

pub mod installation;
pub mod marketplace;

pub use installation::{InstallationService, OutdatedPlugin};
pub use marketplace::{ImportSummary, MarketplaceService};
