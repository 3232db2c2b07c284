//! Result assembly.
//!
//! Turns raw statement rows into [`MatchRecord`]s, merges rows that several
//! branches produced for the same page, and orders them by relevance.

use crate::config::SearchConfig;
use crate::query::RawRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A single ranked place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub title: Option<String>,
    pub url: String,
    /// Source-provided frecency; higher is more relevant.
    pub relevance: i64,
    /// Reachable from a bookmark rather than history alone.
    pub is_bookmarked: bool,
}

impl MatchRecord {
    /// Display label: the URL for untitled pages, otherwise the title,
    /// optionally followed by the URL.
    pub fn label(&self, include_url: bool) -> String {
        match &self.title {
            None => self.url.clone(),
            Some(title) if include_url => format!("{} - {}", title, self.url),
            Some(title) => title.clone(),
        }
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .relevance
            .cmp(&self.relevance)
            .then_with(|| self.title.cmp(&other.title))
    }
}

impl From<RawRow> for MatchRecord {
    fn from(row: RawRow) -> Self {
        Self {
            title: row.title.filter(|t| !t.is_empty()),
            url: row.url,
            relevance: row.frecency,
            is_bookmarked: row.bookmarked,
        }
    }
}

/// Which kinds of places a display wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceFilter {
    #[default]
    All,
    BookmarksOnly,
    HistoryOnly,
}

impl PlaceFilter {
    pub fn accepts(&self, record: &MatchRecord) -> bool {
        match self {
            PlaceFilter::All => true,
            PlaceFilter::BookmarksOnly => record.is_bookmarked,
            PlaceFilter::HistoryOnly => !record.is_bookmarked,
        }
    }
}

/// Ordered, truncated search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    records: Vec<MatchRecord>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<MatchRecord> {
        self.records
    }

    /// Keep only the records `filter` accepts, preserving order.
    pub fn filtered(self, filter: PlaceFilter) -> Self {
        Self {
            records: self
                .records
                .into_iter()
                .filter(|r| filter.accepts(r))
                .collect(),
        }
    }

    /// Display labels under the given label policy.
    pub fn labels(&self, include_url: bool) -> Vec<String> {
        self.records.iter().map(|r| r.label(include_url)).collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = MatchRecord;
    type IntoIter = std::vec::IntoIter<MatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Maps raw rows into a [`ResultSet`].
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    max_results: usize,
    include_url_in_label: bool,
}

impl ResultAssembler {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            max_results: config.max_results,
            include_url_in_label: config.include_url_in_label,
        }
    }

    /// Label for `record` under the configured label policy.
    pub fn label(&self, record: &MatchRecord) -> String {
        record.label(self.include_url_in_label)
    }

    /// Normalize rows into ranked records.
    ///
    /// Rows for the same URL collapse into the best-ranked one, which is
    /// bookmarked if any of its rows was. The sort is stable, so ties keep the
    /// order the executor returned.
    pub fn normalize(&self, rows: Vec<RawRow>) -> ResultSet {
        let mut records: Vec<MatchRecord> = rows.into_iter().map(MatchRecord::from).collect();
        records.sort_by(MatchRecord::rank);

        let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut merged: Vec<MatchRecord> = Vec::with_capacity(records.len());
        for record in records {
            match seen.get(&record.url) {
                Some(&index) => merged[index].is_bookmarked |= record.is_bookmarked,
                None => {
                    seen.insert(record.url.clone(), merged.len());
                    merged.push(record);
                }
            }
        }

        merged.truncate(self.max_results);
        ResultSet { records: merged }
    }
}
