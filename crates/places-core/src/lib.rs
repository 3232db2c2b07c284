//! Places Core - type-ahead search over a browser's history and bookmarks.
//!
//! The browser holds its places database open, so this crate never queries
//! it directly. Searches run against a private snapshot that is replaced
//! whenever the source becomes newer, and results from four match categories
//! (folder members, URLs, titles, tags) are merged into one ranked list.
//!
//! # Example
//!
//! ```rust,ignore
//! use places_core::{PlacesSearch, SearchConfig};
//!
//! fn main() -> places_core::Result<()> {
//!     let search = PlacesSearch::builder()
//!         .config(SearchConfig::default().with_max_results(5))
//!         .build()?;
//!
//!     for record in search.search("rust book")? {
//!         println!("{}", record.label(true));
//!     }
//!
//!     for (engine, url) in search.search_engines()?.templates_for("rust book") {
//!         println!("{}: {}", engine, url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod profile;
pub mod query;
pub mod results;
pub mod search_engines;
pub mod settings;
pub mod snapshot;

pub use config::{PathsConfig, PlacesSchema, SearchConfig};
pub use error::{PlacesError, Result};
pub use query::{BuiltQuery, Keyword, QueryBuilder, RawRow};
pub use results::{MatchRecord, PlaceFilter, ResultAssembler, ResultSet};
pub use search_engines::{SearchEngineTemplate, SearchTemplateProvider};
pub use settings::Settings;
pub use snapshot::{LockArtifactProbe, NoLockProbe, Snapshot, SnapshotManager, WriterLockProbe};

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Main entry point for places searches.
///
/// Owns the snapshot of one source database and the configuration applied to
/// every query. Each call runs `ensure_fresh → build → execute → normalize`
/// with its own connection, so a shared instance can serve overlapping calls.
pub struct PlacesSearch {
    snapshots: SnapshotManager,
    config: SearchConfig,
    search_descriptor: PathBuf,
}

impl PlacesSearch {
    pub fn builder() -> PlacesSearchBuilder {
        PlacesSearchBuilder::default()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn source_path(&self) -> &Path {
        self.snapshots.source_path()
    }

    pub fn search_descriptor_path(&self) -> &Path {
        &self.search_descriptor
    }

    /// Whether a places database exists to search.
    pub fn has_requirements(&self) -> bool {
        self.snapshots.has_requirements()
    }

    /// Search with the configuration this instance was built with.
    pub fn search(&self, raw_query: &str) -> Result<ResultSet> {
        self.search_with(raw_query, &self.config)
    }

    /// Search with an explicit per-call configuration.
    ///
    /// Blank queries fail with [`PlacesError::EmptyQuery`] before the snapshot
    /// is touched. A search that matches nothing returns an empty set.
    pub fn search_with(&self, raw_query: &str, config: &SearchConfig) -> Result<ResultSet> {
        config.validate()?;

        let query = QueryBuilder::new(config).build(raw_query, config.max_results)?;
        let snapshot = self.snapshots.ensure_fresh()?;

        debug!(
            "Executing query with keywords {:?}",
            query.keywords.iter().map(Keyword::as_str).collect::<Vec<_>>()
        );
        let rows = query::execute(&snapshot, &query.sql, &query.params)?;

        Ok(ResultAssembler::new(config).normalize(rows))
    }

    /// Like [`search`](Self::search), but any failure reads as "nothing
    /// found". Callers that must tell the two apart use `search`.
    pub fn search_or_empty(&self, raw_query: &str) -> ResultSet {
        match self.search(raw_query) {
            Ok(results) => results,
            Err(PlacesError::EmptyQuery) => ResultSet::empty(),
            Err(e) => {
                warn!("Places search for {:?} failed: {}", raw_query, e);
                ResultSet::empty()
            }
        }
    }

    /// Parse the search engine descriptor afresh.
    pub fn search_engines(&self) -> Result<SearchTemplateProvider> {
        SearchTemplateProvider::load(&self.search_descriptor)
    }
}

/// Builder for [`PlacesSearch`].
#[derive(Default)]
pub struct PlacesSearchBuilder {
    browser_home: Option<PathBuf>,
    places_db: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    search_descriptor: Option<PathBuf>,
    config: SearchConfig,
    lock_probe: Option<Box<dyn WriterLockProbe>>,
}

impl PlacesSearchBuilder {
    /// Directory holding `profiles.ini`; defaults to `~/.mozilla/firefox`.
    pub fn browser_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_home = Some(path.into());
        self
    }

    /// Use this database instead of discovering the default profile.
    pub fn places_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.places_db = Some(path.into());
        self
    }

    /// Where to keep the snapshot; defaults to the platform cache directory.
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Search engine descriptor; defaults to `search.json` beside the source.
    pub fn search_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_descriptor = Some(path.into());
        self
    }

    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lock_probe(mut self, probe: impl WriterLockProbe + 'static) -> Self {
        self.lock_probe = Some(Box::new(probe));
        self
    }

    pub fn build(self) -> Result<PlacesSearch> {
        self.config.validate()?;

        let source = match self.places_db {
            Some(path) => path,
            None => {
                let home = match self.browser_home {
                    Some(home) => home,
                    None => profile::default_browser_home()?,
                };
                profile::profile_file(&home, PathsConfig::PLACES_DB)?
            }
        };

        let snapshot_path = match self.snapshot_path {
            Some(path) => path,
            None => default_snapshot_path()?,
        };

        let search_descriptor = self.search_descriptor.unwrap_or_else(|| {
            source
                .parent()
                .map(|dir| dir.join(PathsConfig::SEARCH_DESCRIPTOR))
                .unwrap_or_else(|| PathBuf::from(PathsConfig::SEARCH_DESCRIPTOR))
        });

        debug!("Places DB is at {}", source.display());
        debug!("Places DB snapshot is at {}", snapshot_path.display());

        let mut snapshots = SnapshotManager::new(source, snapshot_path);
        if let Some(probe) = self.lock_probe {
            snapshots = snapshots.with_boxed_lock_probe(probe);
        }

        Ok(PlacesSearch {
            snapshots,
            config: self.config,
            search_descriptor,
        })
    }
}

/// Snapshot location under the platform cache directory.
pub fn default_snapshot_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| PlacesError::Config {
        message: "Could not determine cache directory".to_string(),
    })?;
    Ok(cache_dir
        .join(PathsConfig::APP_DIR_NAME)
        .join(PathsConfig::SNAPSHOT_FILE_NAME))
}
