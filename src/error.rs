//! Error type shared by every store operation.

use std::path::PathBuf;
use thiserror::Error;

use crate::queue::status::UnknownStatus;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the queue store.
///
/// A point lookup that finds nothing is not an error; it is `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file or its directory could not be opened.
    #[error("storage unavailable at {}: {reason}", path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    /// A connection could not be checked out of the pool.
    #[error("no connection available: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema DDL could not be applied.
    #[error("failed to apply schema: {0}")]
    Schema(#[source] rusqlite::Error),

    /// A write violated a UNIQUE or CHECK constraint.
    #[error("constraint violation in `{statement}`: {source}")]
    ConstraintViolation {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other engine failure.
    #[error("database error in `{statement}`: {source}")]
    Database {
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A stored row holds a status value outside the defined enum.
    #[error("invalid queue status value: {0}")]
    InvalidStatus(i64),
}

impl StoreError {
    /// Classify an engine error raised while running `sql`.
    pub(crate) fn from_sqlite(sql: &str, err: rusqlite::Error) -> Self {
        if let rusqlite::Error::FromSqlConversionFailure(_, _, inner) = &err {
            if let Some(UnknownStatus(value)) = inner.downcast_ref::<UnknownStatus>() {
                return Self::InvalidStatus(*value);
            }
        }

        let statement = summarize(sql);
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            Self::ConstraintViolation {
                statement,
                source: err,
            }
        } else {
            Self::Database {
                statement,
                source: err,
            }
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Pool(_))
    }
}

/// Collapse whitespace and cap length so the statement reads as intent.
fn summarize(sql: &str) -> String {
    const MAX: usize = 120;
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_failure_is_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT NOT NULL UNIQUE)")
            .unwrap();
        conn.execute("INSERT INTO t (k) VALUES ('a')", []).unwrap();
        let err = conn
            .execute("INSERT INTO t (k) VALUES ('a')", [])
            .unwrap_err();

        let err = StoreError::from_sqlite("INSERT INTO t (k) VALUES ('a')", err);
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_other_failures_are_database_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("UPDATE missing SET x = 1", []).unwrap_err();

        let err = StoreError::from_sqlite("UPDATE missing SET x = 1", err);
        assert!(matches!(err, StoreError::Database { .. }));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_statement_is_flattened() {
        let text = summarize("SELECT *\n    FROM queue\n    WHERE id = ?1");
        assert_eq!(text, "SELECT * FROM queue WHERE id = ?1");

        let long = "x ".repeat(200);
        assert!(summarize(&long).ends_with("..."));
    }
}
