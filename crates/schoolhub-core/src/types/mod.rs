//! Core type definitions used across the SchoolHub workspace.

pub mod id;

pub use id::*;
