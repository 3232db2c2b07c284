//! Centralized configuration for places lookup.
//!
//! This module provides file-name constants, schema constants of the places
//! database, and the per-call [`SearchConfig`] handed to the query builder and
//! result assembler.

use crate::error::{PlacesError, Result};
use serde::{Deserialize, Serialize};

/// Shared directory and file name configuration.
pub struct PathsConfig;

impl PathsConfig {
    pub const BROWSER_HOME: &'static str = ".mozilla/firefox";
    pub const PROFILES_INI: &'static str = "profiles.ini";
    pub const PLACES_DB: &'static str = "places.sqlite";
    pub const SEARCH_DESCRIPTOR: &'static str = "search.json";
    pub const APP_DIR_NAME: &'static str = "places-lookup";
    pub const SNAPSHOT_FILE_NAME: &'static str = "places-snapshot.sqlite";
    pub const SETTINGS_FILE_NAME: &'static str = "settings.json";
    pub const REFRESH_LOCK_SUFFIX: &'static str = ".lock";
    /// Write-ahead log kept beside a database in WAL mode.
    pub const WAL_SUFFIX: &'static str = "-wal";
    pub const SHM_SUFFIX: &'static str = "-shm";
    /// Artifacts the browser keeps next to the profile while it runs.
    pub const WRITER_LOCK_ARTIFACTS: [&'static str; 2] = ["lock", ".parentlock"];
}

/// Well-known values of the places schema.
pub struct PlacesSchema;

impl PlacesSchema {
    pub const BOOKMARK_TYPE: i64 = 1;
    pub const FOLDER_TYPE: i64 = 2;
    /// Tag root folder in the legacy root layout.
    pub const LEGACY_TAG_ROOT_ID: i64 = 4;
    /// Pseudo-URLs used internally for saved queries.
    pub const INTERNAL_URL_PREFIX: &'static str = "place:";
}

/// Search engine descriptor conventions.
pub struct EngineConfig;

impl EngineConfig {
    pub const SEARCH_TERMS_PLACEHOLDER: &'static str = "{searchTerms}";
    pub const SUGGESTION_TYPE: &'static str = "application/x-suggestions+json";
}

/// Options recognized by the search core.
///
/// Passed explicitly into the query builder and the result assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Show `title - url` instead of the bare title.
    pub include_url_in_label: bool,
    /// Result cutoff, `1..=20`.
    pub max_results: usize,
    /// Folder id under which tag folders live.
    pub tag_root_id: i64,
}

impl SearchConfig {
    pub const DEFAULT_MAX_RESULTS: usize = 10;
    pub const MIN_MAX_RESULTS: usize = 1;
    pub const MAX_MAX_RESULTS: usize = 20;

    /// Check that every option is within its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_MAX_RESULTS..=Self::MAX_MAX_RESULTS).contains(&self.max_results) {
            return Err(PlacesError::Config {
                message: format!(
                    "max_results must be between {} and {}, got {}",
                    Self::MIN_MAX_RESULTS,
                    Self::MAX_MAX_RESULTS,
                    self.max_results
                ),
            });
        }
        if self.tag_root_id < 0 {
            return Err(PlacesError::Config {
                message: format!("tag_root_id must not be negative, got {}", self.tag_root_id),
            });
        }
        Ok(())
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_include_url_in_label(mut self, include: bool) -> Self {
        self.include_url_in_label = include;
        self
    }

    pub fn with_tag_root_id(mut self, tag_root_id: i64) -> Self {
        self.tag_root_id = tag_root_id;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            include_url_in_label: true,
            max_results: Self::DEFAULT_MAX_RESULTS,
            tag_root_id: PlacesSchema::LEGACY_TAG_ROOT_ID,
        }
    }
}
