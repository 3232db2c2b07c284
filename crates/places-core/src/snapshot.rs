//! Read-only snapshot of the live places database.
//!
//! The browser keeps its database open and locked, so queries never touch
//! the source file. Instead a copy is kept next to our other data and
//! replaced whole whenever the source becomes newer than the copy:
//!
//! 1. Copy the source into a temp file in the snapshot's directory
//! 2. fsync the temp file
//! 3. Atomically rename it over the snapshot path
//!
//! Readers therefore see either the previous complete snapshot or the new
//! one. When the source runs in WAL mode its `-wal` log is copied too and
//! checkpointed into the temp file before the rename, and the log's mtime
//! counts toward staleness. Refreshes are serialized by an in-process mutex and an advisory lock
//! on a sidecar file shared with other processes.

use crate::config::PathsConfig;
use crate::error::{PlacesError, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use rusqlite::Connection;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

/// A point-in-time copy of the source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Location of the copy.
    pub path: PathBuf,
    /// Modification time of the source the copy was taken from.
    pub captured_at: DateTime<Utc>,
    /// When the copy was written.
    pub copied_at: DateTime<Utc>,
}

/// Best-effort check for the owning application writing the source.
///
/// Never required for correctness: a raw copy of a SQLite file is readable
/// even while the writer holds its own lock.
pub trait WriterLockProbe: Send + Sync {
    fn writer_active(&self, source: &Path) -> bool;
}

/// Probe that never reports an active writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLockProbe;

impl WriterLockProbe for NoLockProbe {
    fn writer_active(&self, _source: &Path) -> bool {
        false
    }
}

/// Probe that looks for the browser's lock artifacts in the profile directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockArtifactProbe;

impl WriterLockProbe for LockArtifactProbe {
    fn writer_active(&self, source: &Path) -> bool {
        let Some(profile_dir) = source.parent() else {
            return false;
        };
        PathsConfig::WRITER_LOCK_ARTIFACTS
            .iter()
            .any(|name| fs::symlink_metadata(profile_dir.join(name)).is_ok())
    }
}

/// Owns the snapshot file and decides when to replace it.
pub struct SnapshotManager {
    source_path: PathBuf,
    snapshot_path: PathBuf,
    probe: Box<dyn WriterLockProbe>,
    refresh_guard: Mutex<()>,
}

impl SnapshotManager {
    /// Create a manager copying `source_path` to `snapshot_path`.
    pub fn new(source_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            snapshot_path: snapshot_path.into(),
            probe: Box::new(NoLockProbe),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Replace the writer-lock probe.
    pub fn with_lock_probe(self, probe: impl WriterLockProbe + 'static) -> Self {
        self.with_boxed_lock_probe(Box::new(probe))
    }

    pub fn with_boxed_lock_probe(mut self, probe: Box<dyn WriterLockProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Whether a source database is present to search at all.
    pub fn has_requirements(&self) -> bool {
        self.source_path.is_file()
    }

    /// Whether the snapshot is missing or older than the source.
    pub fn is_stale(&self) -> Result<bool> {
        let source_mtime = self.source_mtime()?;
        Ok(match modified_time(&self.snapshot_path) {
            Some(snapshot_mtime) => source_mtime > snapshot_mtime,
            None => true,
        })
    }

    /// Return a snapshot no older than the source, copying if needed.
    pub fn ensure_fresh(&self) -> Result<Snapshot> {
        self.refresh(false)
    }

    /// Refresh the snapshot; `force` re-copies even when it is current.
    ///
    /// When the source cannot be read, an existing snapshot is returned
    /// instead. Only the first run, with no snapshot on disk, fails.
    pub fn refresh(&self, force: bool) -> Result<Snapshot> {
        let _guard = self
            .refresh_guard
            .lock()
            .map_err(|_| PlacesError::SnapshotUnreadable {
                message: "Failed to acquire snapshot refresh lock".to_string(),
                path: Some(self.snapshot_path.clone()),
                source: None,
            })?;

        let source_mtime = match self.source_mtime() {
            Ok(mtime) => mtime,
            Err(e) => return self.fall_back(e),
        };

        let snapshot_mtime = modified_time(&self.snapshot_path);
        if !force {
            if let Some(copied) = snapshot_mtime {
                if source_mtime <= copied {
                    return Ok(self.describe(source_mtime, copied));
                }
                if self.probe.writer_active(&self.source_path) {
                    debug!(
                        "Writer active on {}, keeping current snapshot",
                        self.source_path.display()
                    );
                    return Ok(self.describe(copied, copied));
                }
            }
        }

        match self.replace_snapshot(force) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) if e.is_recoverable() => self.fall_back(e),
            Err(e) => Err(e),
        }
    }

    /// Copy the source over the snapshot under the inter-process lock.
    fn replace_snapshot(&self, force: bool) -> Result<Snapshot> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| PlacesError::io_with_path(e, &dir))?;

        let _lock = RefreshLock::acquire(&self.refresh_lock_path())?;

        // Another process may have refreshed while we waited.
        let source_mtime = self.source_mtime()?;
        if !force {
            if let Some(copied) = modified_time(&self.snapshot_path) {
                if source_mtime <= copied {
                    debug!("Snapshot refreshed concurrently, skipping copy");
                    return Ok(self.describe(source_mtime, copied));
                }
            }
        }

        debug!(
            "Refreshing places snapshot {} from {}",
            self.snapshot_path.display(),
            self.source_path.display()
        );

        let mut source = File::open(&self.source_path).map_err(|e| self.source_error(e))?;
        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| PlacesError::io_with_path(e, &dir))?;

        io::copy(&mut source, temp.as_file_mut())
            .map_err(|e| PlacesError::io_with_path(e, temp.path()))?;
        self.merge_wal(temp.path())?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PlacesError::io_with_path(e, temp.path()))?;

        temp.persist(&self.snapshot_path)
            .map_err(|e| PlacesError::io_with_path(e.error, &self.snapshot_path))?;

        let copied_at = modified_time(&self.snapshot_path).unwrap_or_else(SystemTime::now);
        info!("Places snapshot refreshed at {}", self.snapshot_path.display());

        Ok(self.describe(source_mtime, copied_at))
    }

    /// Use whatever snapshot is on disk, or propagate `err` on first run.
    fn fall_back(&self, err: PlacesError) -> Result<Snapshot> {
        match modified_time(&self.snapshot_path) {
            Some(copied) => {
                warn!("Using stale places snapshot: {}", err);
                Ok(self.describe(copied, copied))
            }
            None => Err(err),
        }
    }

    /// Fold the source's write-ahead log into the copy at `copy`.
    ///
    /// Any copy of a WAL-mode database leaves as a single rollback-journal
    /// file, so read-only connections never create `-wal` or `-shm` files
    /// beside the snapshot.
    fn merge_wal(&self, copy: &Path) -> Result<()> {
        let wal = self.wal_path();
        let has_log = fs::metadata(&wal).map(|m| m.len() > 0).unwrap_or(false);
        let wal_header = is_wal_database(copy).map_err(|e| PlacesError::io_with_path(e, copy))?;
        if !has_log && !wal_header {
            return Ok(());
        }

        if has_log {
            let copy_wal = with_suffix(copy, PathsConfig::WAL_SUFFIX);
            fs::copy(&wal, &copy_wal).map_err(|e| self.source_error(e))?;
        }

        let result = checkpoint_into(copy, &wal);
        for suffix in [PathsConfig::WAL_SUFFIX, PathsConfig::SHM_SUFFIX] {
            remove_if_present(&with_suffix(copy, suffix));
        }

        debug!("Merged {} into snapshot copy", wal.display());
        result
    }

    /// Latest of the database and its write-ahead log.
    fn source_mtime(&self) -> Result<SystemTime> {
        let main = fs::metadata(&self.source_path)
            .and_then(|m| m.modified())
            .map_err(|e| self.source_error(e))?;
        Ok(match modified_time(&self.wal_path()) {
            Some(wal) if wal > main => wal,
            _ => main,
        })
    }

    fn wal_path(&self) -> PathBuf {
        with_suffix(&self.source_path, PathsConfig::WAL_SUFFIX)
    }

    fn source_error(&self, err: io::Error) -> PlacesError {
        if err.kind() == io::ErrorKind::NotFound {
            PlacesError::source_unavailable(
                format!("places database not found: {}", self.source_path.display()),
                Some(self.source_path.clone()),
            )
        } else {
            PlacesError::io_with_path(err, &self.source_path)
        }
    }

    fn refresh_lock_path(&self) -> PathBuf {
        with_suffix(&self.snapshot_path, PathsConfig::REFRESH_LOCK_SUFFIX)
    }

    fn describe(&self, captured: SystemTime, copied: SystemTime) -> Snapshot {
        Snapshot {
            path: self.snapshot_path.clone(),
            captured_at: DateTime::<Utc>::from(captured),
            copied_at: DateTime::<Utc>::from(copied),
        }
    }
}

/// Keep `snapshot_path` no older than `source_path`.
pub fn ensure_fresh(source_path: &Path, snapshot_path: &Path) -> Result<Snapshot> {
    SnapshotManager::new(source_path, snapshot_path).ensure_fresh()
}

/// Advisory exclusive lock held for the duration of a copy.
struct RefreshLock {
    file: File,
}

impl RefreshLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| PlacesError::io_with_path(e, path))?;
        file.lock_exclusive()
            .map_err(|e| PlacesError::io_with_path(e, path))?;
        Ok(Self { file })
    }
}

impl Drop for RefreshLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release snapshot refresh lock: {}", e);
        }
    }
}

/// Whether the SQLite header marks the file as WAL mode.
fn is_wal_database(path: &Path) -> io::Result<bool> {
    let mut header = [0u8; 20];
    match File::open(path)?.read_exact(&mut header) {
        Ok(()) => Ok(header.starts_with(SQLITE_MAGIC) && header[18] == 2 && header[19] == 2),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Checkpoint a copied WAL into its database and leave rollback-journal mode.
fn checkpoint_into(copy: &Path, wal: &Path) -> Result<()> {
    let classify = |e: rusqlite::Error| PlacesError::classify_sqlite(e, Some(wal.to_path_buf()));

    let conn = Connection::open(copy).map_err(classify)?;
    // Exclusive locking keeps the wal-index in memory instead of a -shm file.
    conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
        row.get::<_, String>(0)
    })
    .map_err(classify)?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "DELETE", |row| row.get(0))
        .map_err(classify)?;
    conn.close().map_err(|(_, e)| classify(e))?;

    if mode.eq_ignore_ascii_case("delete") {
        Ok(())
    } else {
        Err(PlacesError::SnapshotUnreadable {
            message: format!("copy of {} stayed in {} journal mode", wal.display(), mode),
            path: Some(copy.to_path_buf()),
            source: None,
        })
    }
}

/// `path` with `suffix` appended to its file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
