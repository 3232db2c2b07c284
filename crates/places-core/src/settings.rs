//! Persisted user preferences.
//!
//! Preferences live in a small JSON file. Writes are atomic:
//! 1. Write to a temp file with a unique PID suffix
//! 2. fsync to ensure data reaches disk
//! 3. Atomic rename to the target path
//!
//! A missing file reads as defaults.

use crate::config::{PathsConfig, SearchConfig};
use crate::error::{PlacesError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

/// Read and parse a JSON file, `None` if it doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PlacesError::io_with_path(e, path)),
    };

    let data: T = serde_json::from_str(&contents).map_err(|e| PlacesError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PlacesError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));

    let serialized = serde_json::to_string_pretty(data).map_err(|e| PlacesError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| PlacesError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| PlacesError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| PlacesError::io_with_path(e, &temp_path))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PlacesError::io_with_path(e, path)
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// File-backed preference store.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
}

impl Settings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory.
    pub fn open_default() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| PlacesError::Config {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(Self::new(
            config_dir
                .join(PathsConfig::APP_DIR_NAME)
                .join(PathsConfig::SETTINGS_FILE_NAME),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored configuration, defaults when nothing is stored.
    pub fn load(&self) -> Result<SearchConfig> {
        let config = read_json::<SearchConfig>(&self.path)?.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &SearchConfig) -> Result<()> {
        config.validate()?;
        write_json_atomic(&self.path, config)
    }

    pub fn include_url_in_label(&self) -> Result<bool> {
        Ok(self.load()?.include_url_in_label)
    }

    pub fn set_include_url_in_label(&self, include: bool) -> Result<()> {
        let config = self.load()?.with_include_url_in_label(include);
        self.save(&config)
    }

    pub fn set_max_results(&self, max_results: usize) -> Result<()> {
        let config = self.load()?.with_max_results(max_results);
        self.save(&config)
    }
}
