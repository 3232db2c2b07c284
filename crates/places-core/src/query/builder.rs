//! Multi-branch search statement construction.
//!
//! The statement unions four branches (folder members, URLs, titles, tags).
//! Each branch yields `(the_title, the_url, frecency, bookmarked)` and filters
//! on an AND of `LIKE ?` predicates, one per keyword. Branches bind the full
//! keyword list independently, so the parameter list is the keyword list
//! repeated once per branch in branch order.

use crate::config::{PlacesSchema, SearchConfig};
use crate::error::{PlacesError, Result};
use tracing::debug;

/// Branches of the search statement, in the order they appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Folder,
    Url,
    Title,
    Tag,
}

impl Branch {
    pub const ALL: [Branch; 4] = [Branch::Folder, Branch::Url, Branch::Title, Branch::Tag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Folder => "folder",
            Branch::Url => "url",
            Branch::Title => "title",
            Branch::Tag => "tag",
        }
    }

    /// Column expression each keyword is matched against.
    fn match_column(&self) -> &'static str {
        match self {
            Branch::Folder => "bm.title",
            Branch::Url => "p.url",
            Branch::Title => "IFNULL(bm.title, p.title)",
            Branch::Tag => "t.title",
        }
    }
}

/// A whitespace-separated query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword(String);

impl Keyword {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring pattern used in `LIKE` predicates.
    ///
    /// `%` and `_` typed by the user match literally.
    pub fn pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.0.len() + 2);
        escaped.push('%');
        for c in self.0.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }
}

/// Split a raw query on whitespace, preserving order.
pub fn tokenize(raw_query: &str) -> Vec<Keyword> {
    raw_query
        .split_whitespace()
        .map(|k| Keyword(k.to_string()))
        .collect()
}

/// A ready-to-run statement with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
    pub keywords: Vec<Keyword>,
}

/// Builds the search statement from raw user input.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    tag_root_id: i64,
}

impl QueryBuilder {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            tag_root_id: config.tag_root_id,
        }
    }

    /// Build the statement for `raw_query`, capped at `max_results` rows.
    pub fn build(&self, raw_query: &str, max_results: usize) -> Result<BuiltQuery> {
        let keywords = tokenize(raw_query);
        if keywords.is_empty() {
            return Err(PlacesError::EmptyQuery);
        }

        let patterns: Vec<String> = keywords.iter().map(Keyword::pattern).collect();

        let branches: Vec<String> = Branch::ALL
            .iter()
            .map(|branch| self.branch_sql(*branch, keywords.len()))
            .collect();

        let mut sql = self.common_table_expressions();
        sql.push_str(&collapse_by_url(&branches.join("\nUNION\n")));
        sql.push_str(&format!(
            "\nORDER BY frecency DESC, the_title ASC\nLIMIT {}",
            max_results
        ));

        let params: Vec<String> = Branch::ALL
            .iter()
            .flat_map(|_| patterns.iter().cloned())
            .collect();

        debug!("Preparing query:\n{}", sql);

        Ok(BuiltQuery {
            sql,
            params,
            keywords,
        })
    }

    /// Tag folders and the bookmarks that are not tag entries.
    fn common_table_expressions(&self) -> String {
        format!(
            "WITH tag_folders AS (
    SELECT id, title FROM moz_bookmarks
    WHERE type = {folder} AND parent = {tag_root}
),
bookmarked AS (
    SELECT fk AS place_id, title FROM moz_bookmarks
    WHERE type = {bookmark} AND fk IS NOT NULL
      AND parent <> {tag_root}
      AND parent NOT IN (SELECT id FROM tag_folders)
)
",
            folder = PlacesSchema::FOLDER_TYPE,
            bookmark = PlacesSchema::BOOKMARK_TYPE,
            tag_root = self.tag_root_id,
        )
    }

    fn branch_sql(&self, branch: Branch, keyword_count: usize) -> String {
        let predicates = like_conjunction(branch.match_column(), keyword_count);

        match branch {
            Branch::Folder => format!(
                "SELECT -- {name}
    bm.title AS the_title, p.url AS the_url, p.frecency AS frecency, 1 AS bookmarked
FROM moz_bookmarks f
    JOIN moz_bookmarks bm ON bm.parent = f.id
    JOIN moz_places p ON p.id = bm.fk
WHERE f.type = {folder} AND f.id <> {tag_root} AND f.parent <> {tag_root}
    AND bm.type = {bookmark} AND LENGTH(bm.title) > 0
    AND {predicates}",
                name = branch.as_str(),
                folder = PlacesSchema::FOLDER_TYPE,
                bookmark = PlacesSchema::BOOKMARK_TYPE,
                tag_root = self.tag_root_id,
            ),
            Branch::Url => format!(
                "SELECT -- {name}
    IFNULL(bm.title, p.title) AS the_title, p.url AS the_url, p.frecency AS frecency,
    bm.place_id IS NOT NULL AS bookmarked
FROM moz_places p
    LEFT JOIN bookmarked bm ON bm.place_id = p.id
WHERE {visible}
    AND {predicates}",
                name = branch.as_str(),
                visible = visible_place_filter(),
            ),
            Branch::Title => format!(
                "SELECT -- {name}
    IFNULL(bm.title, p.title) AS the_title, p.url AS the_url, p.frecency AS frecency,
    bm.place_id IS NOT NULL AS bookmarked
FROM moz_places p
    LEFT JOIN bookmarked bm ON bm.place_id = p.id
WHERE {visible}
    AND LENGTH(IFNULL(bm.title, p.title)) > 0
    AND {predicates}",
                name = branch.as_str(),
                visible = visible_place_filter(),
            ),
            Branch::Tag => format!(
                "SELECT -- {name}
    IFNULL(bm.title, p.title) AS the_title, p.url AS the_url, p.frecency AS frecency,
    bm.place_id IS NOT NULL AS bookmarked
FROM tag_folders t
    JOIN moz_bookmarks tb ON tb.parent = t.id
    JOIN moz_places p ON p.id = tb.fk
    LEFT JOIN bookmarked bm ON bm.place_id = p.id
WHERE LENGTH(t.title) > 0
    AND {predicates}",
                name = branch.as_str(),
            ),
        }
    }
}

/// One row per URL, so `LIMIT` counts distinct pages.
///
/// A page reached through several bookmarks or branches keeps its frecency,
/// is bookmarked if any row was, and takes the first non-empty title.
fn collapse_by_url(union: &str) -> String {
    format!(
        "SELECT MIN(NULLIF(the_title, '')) AS the_title, the_url,
    MAX(frecency) AS frecency, MAX(bookmarked) AS bookmarked
FROM (
{union}
)
GROUP BY the_url"
    )
}

/// Hidden pages and internal `place:` queries never surface.
fn visible_place_filter() -> String {
    format!(
        "p.hidden = 0 AND p.url NOT LIKE '{}%'",
        PlacesSchema::INTERNAL_URL_PREFIX
    )
}

fn like_conjunction(column: &str, keyword_count: usize) -> String {
    vec![format!("{} LIKE ? ESCAPE '\\'", column); keyword_count].join(" AND ")
}

/// Build with a fresh builder for `config`.
pub fn build(raw_query: &str, config: &SearchConfig) -> Result<BuiltQuery> {
    QueryBuilder::new(config).build(raw_query, config.max_results)
}
