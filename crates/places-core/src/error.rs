//! Error types for places lookup.
//!
//! Every failure surfaced by the core maps onto one of the categories the
//! search pipeline distinguishes: the source could not be found, the snapshot
//! could not be read, the query was empty, or the statement itself was
//! malformed. A search that completes with no rows is not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the places core.
#[derive(Debug, Error)]
pub enum PlacesError {
    // Source discovery errors
    #[error("Places source unavailable: {message}")]
    SourceUnavailable {
        message: String,
        path: Option<PathBuf>,
    },

    // Snapshot errors
    #[error("Snapshot unreadable at {path:?}: {message}")]
    SnapshotUnreadable {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Query errors
    #[error("Empty query: no keywords to search for")]
    EmptyQuery,

    #[error("Query build error: {message}")]
    QueryBuild {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for places operations.
pub type Result<T> = std::result::Result<T, PlacesError>;

impl From<std::io::Error> for PlacesError {
    fn from(err: std::io::Error) -> Self {
        PlacesError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for PlacesError {
    fn from(err: serde_json::Error) -> Self {
        PlacesError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for PlacesError {
    fn from(err: rusqlite::Error) -> Self {
        PlacesError::classify_sqlite(err, None)
    }
}

impl PlacesError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PlacesError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a `SourceUnavailable` error for a path.
    pub fn source_unavailable(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        PlacesError::SourceUnavailable {
            message: message.into(),
            path,
        }
    }

    /// Sort a SQLite failure into snapshot-level or statement-level trouble.
    ///
    /// Files that are missing, corrupt, not a database, or locked against
    /// reading are `SnapshotUnreadable`. Everything else is a defect in the
    /// generated statement.
    pub fn classify_sqlite(err: rusqlite::Error, path: Option<PathBuf>) -> Self {
        use rusqlite::ErrorCode;

        let unreadable = match &err {
            rusqlite::Error::SqliteFailure(e, _) => matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::PermissionDenied
                    | ErrorCode::SystemIoFailure
            ),
            rusqlite::Error::InvalidPath(_) => true,
            _ => false,
        };

        if unreadable {
            PlacesError::SnapshotUnreadable {
                message: err.to_string(),
                path,
                source: Some(err),
            }
        } else {
            PlacesError::QueryBuild {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }

    /// Whether a snapshot refresh failing with this error may fall back to
    /// an existing snapshot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlacesError::SourceUnavailable { .. }
                | PlacesError::SnapshotUnreadable { .. }
                | PlacesError::Io { .. }
        )
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlacesError::SourceUnavailable { .. } => 2,
            PlacesError::SnapshotUnreadable { .. } => 3,
            PlacesError::EmptyQuery => 64,
            PlacesError::Config { .. } => 78,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PlacesError::EmptyQuery.to_string(),
            "Empty query: no keywords to search for"
        );
        let err = PlacesError::source_unavailable("no default profile", None);
        assert_eq!(err.to_string(), "Places source unavailable: no default profile");
    }

    #[test]
    fn test_classify_not_a_database() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_NOTADB),
            Some("file is not a database".into()),
        );
        let classified = PlacesError::classify_sqlite(err, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(classified, PlacesError::SnapshotUnreadable { .. }));
    }

    #[test]
    fn test_classify_syntax_error() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some("near \"selec\": syntax error".into()),
        );
        let classified = PlacesError::classify_sqlite(err, None);
        assert!(matches!(classified, PlacesError::QueryBuild { .. }));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(PlacesError::source_unavailable("gone", None).is_recoverable());
        assert!(!PlacesError::EmptyQuery.is_recoverable());
        assert!(!PlacesError::Config {
            message: "bad".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PlacesError::EmptyQuery.exit_code(), 64);
        assert_eq!(PlacesError::source_unavailable("gone", None).exit_code(), 2);
    }
}
