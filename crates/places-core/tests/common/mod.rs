//! Shared fixtures: a minimal places database with the legacy root layout.

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const MENU_ROOT: i64 = 2;
pub const TAG_ROOT: i64 = 4;

/// Writable handle on a fixture database.
pub struct PlacesFixture {
    conn: Connection,
    next_bookmark_id: i64,
}

impl PlacesFixture {
    pub fn create(path: &Path) -> Self {
        let conn = Connection::open(path).expect("Failed to create places fixture");
        conn.execute_batch(
            "CREATE TABLE moz_places (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL,
                title TEXT,
                rev_host TEXT,
                frecency INTEGER NOT NULL DEFAULT -1,
                hidden INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE moz_bookmarks (
                id INTEGER PRIMARY KEY,
                type INTEGER,
                fk INTEGER DEFAULT NULL,
                parent INTEGER,
                position INTEGER,
                title TEXT
            );
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (1, 2, 0, '');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (2, 2, 1, 'Bookmarks Menu');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (3, 2, 1, 'Bookmarks Toolbar');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (4, 2, 1, 'Tags');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (5, 2, 1, 'Unsorted Bookmarks');",
        )
        .expect("Failed to create places schema");

        Self {
            conn,
            next_bookmark_id: 100,
        }
    }

    pub fn open(path: &Path) -> Self {
        Self {
            conn: Connection::open(path).expect("Failed to open places fixture"),
            next_bookmark_id: 10_000,
        }
    }

    /// Switch to WAL mode; later writes stay in `-wal` while this handle lives.
    pub fn enable_wal(&self) {
        let mode: String = self
            .conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    pub fn add_place(&self, url: &str, title: Option<&str>, frecency: i64) -> i64 {
        let rev_host: String = url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .map(|host| host.chars().rev().collect::<String>() + ".")
            .unwrap_or_default();
        self.conn
            .execute(
                "INSERT INTO moz_places (url, title, rev_host, frecency) VALUES (?1, ?2, ?3, ?4)",
                params![url, title, rev_host, frecency],
            )
            .unwrap();
        self.conn.last_insert_rowid()
    }

    pub fn add_hidden_place(&self, url: &str, title: &str, frecency: i64) -> i64 {
        let id = self.add_place(url, Some(title), frecency);
        self.conn
            .execute("UPDATE moz_places SET hidden = 1 WHERE id = ?1", params![id])
            .unwrap();
        id
    }

    pub fn add_folder(&mut self, parent: i64, title: &str) -> i64 {
        let id = self.next_id();
        self.conn
            .execute(
                "INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (?1, 2, ?2, ?3)",
                params![id, parent, title],
            )
            .unwrap();
        id
    }

    pub fn bookmark(&mut self, place_id: i64, parent: i64, title: Option<&str>) -> i64 {
        let id = self.next_id();
        self.conn
            .execute(
                "INSERT INTO moz_bookmarks (id, type, fk, parent, title) VALUES (?1, 1, ?2, ?3, ?4)",
                params![id, place_id, parent, title],
            )
            .unwrap();
        id
    }

    /// Tag a place, creating the tag folder under the tag root when needed.
    pub fn tag(&mut self, place_id: i64, tag: &str) {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM moz_bookmarks WHERE type = 2 AND parent = ?1 AND title = ?2",
                params![TAG_ROOT, tag],
                |row| row.get(0),
            )
            .ok();
        let folder = match existing {
            Some(id) => id,
            None => self.add_folder(TAG_ROOT, tag),
        };
        self.bookmark(place_id, folder, None);
    }

    fn next_id(&mut self) -> i64 {
        self.next_bookmark_id += 1;
        self.next_bookmark_id
    }
}

/// Temp profile with a places database, a snapshot location and a
/// search descriptor path.
pub struct TestProfile {
    pub dir: TempDir,
    pub places_db: PathBuf,
    pub snapshot: PathBuf,
}

impl TestProfile {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let profile_dir = dir.path().join("firefox").join("abcd.default");
        std::fs::create_dir_all(&profile_dir).unwrap();
        let places_db = profile_dir.join("places.sqlite");
        let snapshot = dir.path().join("cache").join("places-snapshot.sqlite");
        Self {
            dir,
            places_db,
            snapshot,
        }
    }

    pub fn browser_home(&self) -> PathBuf {
        self.dir.path().join("firefox")
    }

    pub fn fixture(&self) -> PlacesFixture {
        PlacesFixture::create(&self.places_db)
    }

    pub fn wal(&self) -> PathBuf {
        let mut name = self.places_db.as_os_str().to_os_string();
        name.push("-wal");
        PathBuf::from(name)
    }

    /// Push the source mtime past the snapshot's so the next search re-copies.
    pub fn touch_source_after_snapshot(&self) {
        self.touch_after_snapshot(&self.places_db);
    }

    pub fn touch_after_snapshot(&self, path: &Path) {
        let snapshot_mtime = std::fs::metadata(&self.snapshot)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(snapshot_mtime + Duration::from_secs(5)).unwrap();
    }
}

/// The two-page scenario: one bookmarked page and one history entry.
pub fn example_scenario(fixture: &mut PlacesFixture) {
    let site = fixture.add_place("http://example.com", Some("Example Site"), 100);
    fixture.bookmark(site, MENU_ROOT, Some("Example Site"));
    fixture.add_place("http://example.com/docs", Some("Example Docs"), 50);
}
