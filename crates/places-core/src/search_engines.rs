//! Search engine URL templates.
//!
//! Reads the browser's search engine descriptor (`search.json`) and resolves
//! each visible engine's result-page URL for a query. Suggestion endpoints
//! and hidden engines are skipped.

use crate::config::EngineConfig;
use crate::error::{PlacesError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// One URL template of a search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEngineTemplate {
    /// Display name of the engine.
    pub name: String,
    pub url_template: String,
    /// Query parameters in descriptor order; values may hold the placeholder.
    pub params: Vec<(String, String)>,
    pub is_suggestion_variant: bool,
    pub hidden: bool,
}

impl SearchEngineTemplate {
    /// Substitute `query` into the template and parameters.
    pub fn resolve(&self, query: &str) -> String {
        let placeholder = EngineConfig::SEARCH_TERMS_PLACEHOLDER;
        let mut url = self
            .url_template
            .replace(placeholder, &urlencoding::encode(query));

        if self.params.is_empty() {
            return url;
        }

        let query_string = self
            .params
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(&value.replace(placeholder, query))
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query_string);
        url
    }

    fn is_searchable(&self) -> bool {
        !self.hidden && !self.is_suggestion_variant
    }
}

#[derive(Debug, Deserialize)]
struct RawEngine {
    #[serde(rename = "_name")]
    name: String,
    #[serde(rename = "_hidden", default)]
    hidden: bool,
    #[serde(rename = "_urls", default)]
    urls: Vec<RawUrl>,
}

#[derive(Debug, Deserialize)]
struct RawUrl {
    template: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    params: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    engines: Vec<RawEngine>,
}

/// Parsed descriptor, yielding resolved search URLs.
#[derive(Debug, Clone, Default)]
pub struct SearchTemplateProvider {
    templates: Vec<SearchEngineTemplate>,
}

impl SearchTemplateProvider {
    /// Parse descriptor JSON.
    ///
    /// Sources are read from the top-level `directories` object when present,
    /// otherwise from the top level itself. Entries without an `engines`
    /// list are ignored.
    pub fn parse(json: &str) -> Result<Self> {
        let mut document: serde_json::Value = serde_json::from_str(json)?;
        let sources = match document.get_mut("directories").map(serde_json::Value::take) {
            Some(directories) => directories,
            None => document,
        };

        let sources: BTreeMap<String, serde_json::Value> = match sources {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => {
                return Err(PlacesError::Json {
                    message: "search descriptor is not an object".to_string(),
                    source: None,
                })
            }
        };

        let mut templates = Vec::new();
        for (source_name, value) in sources {
            if value.get("engines").is_none() {
                continue;
            }
            let source: RawSource = match serde_json::from_value(value) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping search source {}: {}", source_name, e);
                    continue;
                }
            };

            for engine in source.engines {
                for url in engine.urls {
                    templates.push(SearchEngineTemplate {
                        name: engine.name.clone(),
                        url_template: url.template,
                        params: url.params.into_iter().map(|p| (p.name, p.value)).collect(),
                        is_suggestion_variant: url.kind.as_deref()
                            == Some(EngineConfig::SUGGESTION_TYPE),
                        hidden: engine.hidden,
                    });
                }
            }
        }

        debug!("Parsed {} search engine templates", templates.len());
        Ok(Self { templates })
    }

    /// Read and parse a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacesError::source_unavailable(
                    format!("search descriptor not found: {}", path.display()),
                    Some(path.to_path_buf()),
                )
            } else {
                PlacesError::io_with_path(e, path)
            }
        })?;
        Self::parse(&json)
    }

    pub fn templates(&self) -> &[SearchEngineTemplate] {
        &self.templates
    }

    /// `(engine name, resolved URL)` for every visible, non-suggestion
    /// template. Computed lazily on each call.
    pub fn templates_for<'a>(
        &'a self,
        query: &'a str,
    ) -> impl Iterator<Item = (&'a str, String)> + 'a {
        self.templates
            .iter()
            .filter(|t| t.is_searchable())
            .map(move |t| (t.name.as_str(), t.resolve(query)))
    }
}
