//! Database error categorization
//!
//! Find-or-create paths (batch rows, SQL leases) race against other workers and
//! need to tell "the row already exists" apart from real failures.
//!
//! # Examples
//!
//! ```rust
//! use bulk_import::common::db_errors::DbErrorKind;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("tracker".to_string());
//! assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
//! ```

use sea_orm::DbErr;

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Query returned no results
    NotFound,

    /// Unique constraint violation; another writer created the row first
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Connection could not be established or was lost
    ConnectionError,

    /// Query or acquire timeout
    Timeout,

    /// Database is locked or deadlocked
    Locked,

    /// Anything else
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    pub fn from_db_err(err: &DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::ConnectionAcquire(_) => Self::Timeout,
            DbErr::Conn(msg) => {
                if msg.to_string().to_lowercase().contains("timeout") {
                    Self::Timeout
                } else {
                    Self::ConnectionError
                }
            }
            DbErr::Exec(_) | DbErr::Query(_) | DbErr::Custom(_) => {
                Self::from_message(&err.to_string())
            }
            _ => Self::Unknown,
        }
    }

    fn from_message(message: &str) -> Self {
        let msg_lower = message.to_lowercase();
        if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
            Self::UniqueViolation
        } else if msg_lower.contains("foreign key") {
            Self::ForeignKeyViolation
        } else if msg_lower.contains("deadlock") || msg_lower.contains("database is locked") {
            Self::Locked
        } else if msg_lower.contains("timeout") {
            Self::Timeout
        } else {
            Self::Unknown
        }
    }
}

/// Shorthand for the find-or-create race check
pub fn is_unique_violation(err: &DbErr) -> bool {
    DbErrorKind::from_db_err(err) == DbErrorKind::UniqueViolation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found() {
        let err = DbErr::RecordNotFound("batch".to_string());
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_sqlite_unique_message() {
        let err = DbErr::Custom(
            "UNIQUE constraint failed: pipeline_batches.tracker_id, pipeline_batches.batch_number"
                .to_string(),
        );
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_locked_is_not_a_unique_violation() {
        let err = DbErr::Custom("database is locked".to_string());
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::Locked);
        assert!(!is_unique_violation(&err));
    }
}
