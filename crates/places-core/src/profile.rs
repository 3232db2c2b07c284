//! Browser profile discovery.
//!
//! Locates the active profile by reading `profiles.ini` in the browser home
//! directory. The default profile is the first section marked `Default=1`;
//! when none is marked, the first section carrying a `Path` is used.

use crate::config::PathsConfig;
use crate::error::{PlacesError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One `[section]` of an INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    /// Look up a key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed `profiles.ini`.
#[derive(Debug, Clone, Default)]
pub struct ProfilesIni {
    sections: Vec<IniSection>,
}

impl ProfilesIni {
    /// Parse INI text. Unknown lines are ignored; keys outside any section
    /// are dropped.
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<IniSection> = Vec::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.push(IniSection {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
                continue;
            };

            if let Some(section) = sections.last_mut() {
                section
                    .entries
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        Self { sections }
    }

    /// Read and parse a `profiles.ini` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacesError::source_unavailable(
                    format!("profiles descriptor not found: {}", path.display()),
                    Some(path.to_path_buf()),
                )
            } else {
                PlacesError::io_with_path(e, path)
            }
        })?;
        Ok(Self::parse(&text))
    }

    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    /// The section describing the default profile.
    pub fn default_profile(&self) -> Option<&IniSection> {
        let with_path = |s: &&IniSection| s.get("Path").is_some_and(|p| !p.is_empty());

        self.sections
            .iter()
            .filter(with_path)
            .find(|s| s.get("Default") == Some("1"))
            .or_else(|| self.sections.iter().find(with_path))
    }

    /// Resolve the default profile directory against the browser home.
    pub fn default_profile_dir(&self, browser_home: &Path) -> Option<PathBuf> {
        let section = self.default_profile()?;
        let path = section.get("Path")?;

        let absolute = path.starts_with('/') || section.get("IsRelative") == Some("0");
        if absolute {
            Some(PathBuf::from(path))
        } else {
            Some(browser_home.join(path))
        }
    }
}

/// Default browser home directory (`~/.mozilla/firefox`).
pub fn default_browser_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| PlacesError::Config {
        message: "Could not determine home directory".to_string(),
    })?;
    Ok(home.join(PathsConfig::BROWSER_HOME))
}

/// Resolve a file inside the default profile, e.g. `places.sqlite`.
pub fn profile_file(browser_home: &Path, needed_file: &str) -> Result<PathBuf> {
    let ini_path = browser_home.join(PathsConfig::PROFILES_INI);
    let profiles = ProfilesIni::load(&ini_path)?;

    let profile_dir = profiles.default_profile_dir(browser_home).ok_or_else(|| {
        PlacesError::source_unavailable(
            format!("no usable profile path in {}", ini_path.display()),
            Some(ini_path.clone()),
        )
    })?;

    let file = profile_dir.join(needed_file);
    debug!("Resolved profile file {} to {}", needed_file, file.display());
    Ok(file)
}
