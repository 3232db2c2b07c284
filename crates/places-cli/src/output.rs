//! Rendering of search results for the terminal.

use places_core::ResultSet;
use serde::Serialize;
use std::io::{self, Write};

/// Everything a single invocation found.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    /// `None` when places were not searched.
    pub places: Option<ResultSet>,
    /// `(engine, url)` pairs; `None` when engines were not listed.
    pub engines: Option<Vec<(String, String)>>,
    #[serde(skip)]
    pub include_url_in_label: bool,
}

impl Report {
    /// Human-readable listing.
    pub fn write_text(&self, out: &mut impl Write) -> io::Result<()> {
        if let Some(places) = &self.places {
            writeln!(out, "Results:")?;
            if places.is_empty() {
                writeln!(out, "No results")?;
            }
            for record in places.iter() {
                writeln!(out, "{}", record.label(self.include_url_in_label))?;
            }
        }

        if let Some(engines) = &self.engines {
            if self.places.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "Search engines:")?;
            for (name, url) in engines {
                writeln!(out, "{}: {}", name, url)?;
            }
        }

        Ok(())
    }

    pub fn write_json(&self, out: &mut impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}
