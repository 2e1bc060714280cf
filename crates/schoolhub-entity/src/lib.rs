//! # schoolhub-entity
//!
//! Domain entity models for the SchoolHub platform core. Every struct in
//! this crate is a stored document or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, and `Deserialize`; documents are
//! stored as JSON, so serde attributes define the storage shape.

pub mod plugin;
