//! Runs the `places-lookup` binary against a throwaway profile.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const SEARCH_JSON: &str = r#"{
    "directories": {
        "app": {
            "engines": [
                {
                    "_name": "Wiki",
                    "_urls": [
                        {"template": "http://wiki.test/w?search={searchTerms}", "type": "text/html"},
                        {"template": "http://wiki.test/suggest?q={searchTerms}", "type": "application/x-suggestions+json"}
                    ]
                }
            ]
        }
    }
}"#;

struct Profile {
    dir: TempDir,
}

impl Profile {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let profile = Self { dir };
        std::fs::create_dir_all(profile.places_db().parent().unwrap()).unwrap();

        let conn = Connection::open(profile.places_db()).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_places (
                id INTEGER PRIMARY KEY, url TEXT NOT NULL, title TEXT,
                rev_host TEXT, frecency INTEGER NOT NULL DEFAULT -1,
                hidden INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE moz_bookmarks (
                id INTEGER PRIMARY KEY, type INTEGER, fk INTEGER DEFAULT NULL,
                parent INTEGER, position INTEGER, title TEXT
            );
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (1, 2, 0, '');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (2, 2, 1, 'Bookmarks Menu');
            INSERT INTO moz_bookmarks (id, type, parent, title) VALUES (4, 2, 1, 'Tags');
            INSERT INTO moz_places (id, url, title, frecency)
                VALUES (1, 'http://example.com', 'Example Site', 100);
            INSERT INTO moz_places (id, url, title, frecency)
                VALUES (2, 'http://example.com/docs', 'Example Docs', 50);
            INSERT INTO moz_bookmarks (id, type, fk, parent, title)
                VALUES (10, 1, 1, 2, 'Example Site');",
        )
        .unwrap();

        std::fs::write(profile.search_json(), SEARCH_JSON).unwrap();
        profile
    }

    fn places_db(&self) -> PathBuf {
        self.dir.path().join("profile").join("places.sqlite")
    }

    fn search_json(&self) -> PathBuf {
        self.dir.path().join("profile").join("search.json")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_places-lookup"))
            .arg("--places-db")
            .arg(self.places_db())
            .arg("--snapshot")
            .arg(self.dir.path().join("cache").join("snapshot.sqlite"))
            .arg("--settings")
            .arg(self.dir.path().join("settings.json"))
            .args(args)
            .output()
            .expect("Failed to run places-lookup")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn engines_only(descriptor: &Path, query: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_places-lookup"))
        .arg("--engines-only")
        .arg("--search-json")
        .arg(descriptor)
        .arg(query)
        .output()
        .expect("Failed to run places-lookup")
}

#[test]
fn test_lists_places_and_engines() {
    let profile = Profile::new();
    let output = profile.run(&["example"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Results:\n\
         Example Site - http://example.com\n\
         Example Docs - http://example.com/docs\n\
         \n\
         Search engines:\n\
         Wiki: http://wiki.test/w?search=example\n"
    );
}

#[test]
fn test_no_results() {
    let profile = Profile::new();
    let output = profile.run(&["--places-only", "nonexistent"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "Results:\nNo results\n");
}

#[test]
fn test_options_shape_listing() {
    let profile = Profile::new();
    let output = profile.run(&["--places-only", "--no-url", "-n", "1", "example"]);
    assert_eq!(stdout(&output), "Results:\nExample Site\n");

    let output = profile.run(&["--places-only", "--no-history", "example"]);
    assert_eq!(stdout(&output), "Results:\nExample Site - http://example.com\n");
}

#[test]
fn test_engines_only_without_profile() {
    let profile = Profile::new();
    let output = engines_only(&profile.search_json(), "rust book");

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "Search engines:\nWiki: http://wiki.test/w?search=rust%20book\n"
    );
}

#[test]
fn test_engines_only_missing_descriptor_fails() {
    let dir = TempDir::new().unwrap();
    let output = engines_only(&dir.path().join("search.json"), "rust");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_json_output() {
    let profile = Profile::new();
    let output = profile.run(&["--json", "docs"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = value["places"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["url"], "http://example.com/docs");
    assert_eq!(records[0]["is_bookmarked"], false);
    assert_eq!(value["engines"][0][0], "Wiki");
}

#[test]
fn test_blank_query_exit_code() {
    let profile = Profile::new();
    let output = profile.run(&["   "]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_invalid_max_results_exit_code() {
    let profile = Profile::new();
    let output = profile.run(&["-n", "0", "example"]);
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn test_missing_places_db_exit_code() {
    let profile = Profile::new();
    std::fs::remove_file(profile.places_db()).unwrap();
    let output = profile.run(&["--places-only", "example"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_remembered_defaults_apply_to_later_runs() {
    let profile = Profile::new();
    let output = profile.run(&["--places-only", "--remember", "--no-url", "-n", "1", "example"]);
    assert!(output.status.success());

    let output = profile.run(&["--places-only", "example"]);
    assert_eq!(stdout(&output), "Results:\nExample Site\n");
}
