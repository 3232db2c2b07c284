//! Statement execution against a snapshot.

use crate::error::{PlacesError, Result};
use crate::snapshot::Snapshot;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::Path;
use tracing::debug;

/// One row as returned by the search statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub title: Option<String>,
    pub url: String,
    pub frecency: i64,
    pub bookmarked: bool,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            title: row.get(0)?,
            url: row.get(1)?,
            frecency: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
            bookmarked: row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0,
        })
    }
}

/// Run `sql` with positional `params` against the snapshot.
///
/// A connection is opened for this call only and dropped on every path.
pub fn execute(snapshot: &Snapshot, sql: &str, params: &[String]) -> Result<Vec<RawRow>> {
    execute_at(&snapshot.path, sql, params)
}

/// Same as [`execute`] for a bare database path.
pub fn execute_at(db_path: &Path, sql: &str, params: &[String]) -> Result<Vec<RawRow>> {
    if !db_path.is_file() {
        return Err(PlacesError::SnapshotUnreadable {
            message: "snapshot file does not exist".to_string(),
            path: Some(db_path.to_path_buf()),
            source: None,
        });
    }

    let classify =
        |e: rusqlite::Error| PlacesError::classify_sqlite(e, Some(db_path.to_path_buf()));

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(classify)?;

    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), RawRow::from_row)
        .map_err(classify)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(classify)?;

    debug!("Query returned {} rows from {}", rows.len(), db_path.display());
    Ok(rows)
}
