//! Repositories wrapping sea-orm queries.

pub mod drive;
pub mod student;
pub mod vaccination;

pub use drive::DriveRepository;
pub use student::{StudentRepository, StudentSearch};
pub use vaccination::{ReportRow, VaccinationRepository};

use sea_orm::{DbErr, SqlErr};
use vaxtrack_common::AppError;

/// Returns true if the error is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Map a store error, turning unique index violations into `on_unique`.
pub(crate) fn map_write_err(err: DbErr, on_unique: impl FnOnce() -> AppError) -> AppError {
    if is_unique_violation(&err) {
        on_unique()
    } else {
        AppError::Database(err.to_string())
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
#[must_use]
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ann"), "ann");
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }

    #[test]
    fn test_non_unique_errors_map_to_database() {
        let err = map_write_err(DbErr::Custom("boom".to_string()), || {
            AppError::Conflict("dup".to_string())
        });
        assert!(matches!(err, AppError::Database(_)));
    }
}
