//! Mapping of `sqlx` errors into [`AppError`].

use schoolhub_core::error::{AppError, ErrorKind};

/// Map a database error, turning unique-constraint violations into
/// `Conflict` so callers can tell "already exists" from a broken store.
pub fn map_db_error(context: &str, err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
            return AppError::with_source(
                ErrorKind::Conflict,
                format!("{context}: duplicate key violates {constraint}"),
                err,
            );
        }
    }
    AppError::with_source(ErrorKind::Database, context.to_string(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_map_to_database_kind() {
        let err = map_db_error("Failed to find plugin", sqlx::Error::RowNotFound);
        assert_eq!(err.kind, ErrorKind::Database);
        assert_eq!(err.message, "Failed to find plugin");
    }
}
