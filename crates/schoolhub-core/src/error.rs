//! Error type shared by every SchoolHub crate.
//!
//! Storage, event and service code all return [`AppError`]; callers branch on
//! [`ErrorKind`] rather than on message text.

use std::fmt;
use thiserror::Error;

/// Coarse category of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No document, installation or plugin matched.
    NotFound,
    /// Input was rejected before touching the store.
    Validation,
    /// A unique key (plugin id, tenant installation) is already taken.
    Conflict,
    /// Unexpected failure inside the process.
    Internal,
    /// The document store failed.
    Database,
    /// Configuration could not be loaded or is incomplete.
    Configuration,
    /// A document or event payload could not be (de)serialized.
    Serialization,
    /// An event handler failed while reacting to a domain event.
    HandlerFailure,
}

impl ErrorKind {
    /// Stable upper-case code used in messages and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::HandlerFailure => "HANDLER_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A categorized error with an optional cause.
///
/// Cloning keeps the kind and message but drops the cause, which is not
/// `Clone` in general.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// What went wrong, for branching.
    pub kind: ErrorKind,
    /// Message for operators and API clients.
    pub message: String,
    /// Underlying error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Error of `kind` without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Error of `kind` wrapping `source`.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(kind, message)
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn handler_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerFailure, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self::new(self.kind, self.message.clone())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, format!("Malformed JSON: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(ErrorKind::Configuration, format!("Bad configuration: {err}"), err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("Invalid input: {err}"), err)
    }
}
