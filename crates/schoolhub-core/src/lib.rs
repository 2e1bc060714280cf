//! # schoolhub-core
//!
//! Core crate for the SchoolHub platform. Contains configuration schemas,
//! typed identifiers, the domain event envelope and event catalog,
//! generic repository traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SchoolHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
