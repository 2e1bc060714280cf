//! Convenience result type alias for SchoolHub.

use crate::error::AppError;

/// A specialized `Result` type for SchoolHub operations.
pub type AppResult<T> = Result<T, AppError>;
