//! places-lookup - search browser history, bookmarks and search engines.
//!
//! Thin front end over `places-core`: resolves the profile, refreshes the
//! snapshot, runs one query and prints what it found.

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use output::Report;
use places_core::{
    LockArtifactProbe, PlaceFilter, PlacesError, PlacesSearch, SearchConfig,
    SearchTemplateProvider, Settings,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "places-lookup")]
#[command(about = "Search Firefox history, bookmarks and search engines")]
struct Args {
    /// Search terms; every term must match
    #[arg(required = true)]
    query: Vec<String>,

    /// Only list search engine URLs
    #[arg(short, long, conflicts_with = "places_only")]
    engines_only: bool,

    /// Only list places (bookmarks and history)
    #[arg(short, long)]
    places_only: bool,

    /// Leave out pages that are only in history
    #[arg(long)]
    no_history: bool,

    /// Maximum number of places to show (1-20)
    #[arg(short = 'n', long)]
    max_results: Option<usize>,

    /// Show titles without their URLs
    #[arg(long)]
    no_url: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Re-copy the places database even if the snapshot looks current
    #[arg(long)]
    force_refresh: bool,

    /// Skip refreshing while the browser holds its profile lock
    #[arg(long)]
    respect_lock: bool,

    /// Directory containing profiles.ini
    #[arg(long)]
    browser_home: Option<PathBuf>,

    /// Places database to search instead of the default profile's
    #[arg(long)]
    places_db: Option<PathBuf>,

    /// Where to keep the snapshot copy
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Search engine descriptor (search.json)
    #[arg(long)]
    search_json: Option<PathBuf>,

    /// Preferences file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Store --max-results and --no-url as the new defaults
    #[arg(long)]
    remember: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn query_string(&self) -> String {
        self.query.join(" ")
    }

    fn place_filter(&self) -> PlaceFilter {
        if self.no_history {
            PlaceFilter::BookmarksOnly
        } else {
            PlaceFilter::All
        }
    }

    fn search_config(&self) -> Result<SearchConfig> {
        let settings = match &self.settings {
            Some(path) => Some(Settings::new(path)),
            None => match Settings::open_default() {
                Ok(settings) => Some(settings),
                Err(e) => {
                    warn!("Using built-in defaults: {}", e);
                    None
                }
            },
        };

        let mut config = match &settings {
            Some(settings) => settings
                .load()
                .with_context(|| format!("Failed to load {}", settings.path().display()))?,
            None => SearchConfig::default(),
        };

        if let Some(max_results) = self.max_results {
            config = config.with_max_results(max_results);
        }
        if self.no_url {
            config = config.with_include_url_in_label(false);
        }

        config.validate()?;

        if self.remember {
            remember_defaults(settings.as_ref(), &config)?;
        }
        Ok(config)
    }
}

fn remember_defaults(settings: Option<&Settings>, config: &SearchConfig) -> Result<()> {
    let settings =
        settings.context("No preferences file to remember defaults in; pass --settings")?;
    settings.save(config)?;
    info!("Saved defaults to {}", settings.path().display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<PlacesError>()
                .map(PlacesError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let query = args.query_string();
    let config = args.search_config()?;
    debug!("Using configuration {:?}", config);

    let mut report = Report {
        include_url_in_label: config.include_url_in_label,
        ..Report::default()
    };

    // Engines from an explicit descriptor need no profile at all.
    let search = if args.engines_only && args.search_json.is_some() {
        None
    } else {
        Some(build_search(args, config)?)
    };

    if !args.engines_only {
        if let Some(search) = &search {
            info!("Searching places for {:?}", query);
            if args.force_refresh {
                search.snapshots().refresh(true)?;
            }
            let places = search.search(&query)?.filtered(args.place_filter());
            report.places = Some(places);
        }
    }

    if !args.places_only {
        let descriptor = match (&args.search_json, &search) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(search)) => Some(search.search_descriptor_path().to_path_buf()),
            (None, None) => None,
        };
        if let Some(descriptor) = descriptor {
            report.engines = Some(engine_urls(&descriptor, &query, args.engines_only)?);
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report.write_json(&mut out)?;
    } else {
        report.write_text(&mut out)?;
    }
    Ok(())
}

fn build_search(args: &Args, config: SearchConfig) -> Result<PlacesSearch> {
    let mut builder = PlacesSearch::builder().config(config);
    if let Some(home) = &args.browser_home {
        builder = builder.browser_home(home);
    }
    if let Some(db) = &args.places_db {
        builder = builder.places_db(db);
    }
    if let Some(snapshot) = &args.snapshot {
        builder = builder.snapshot_path(snapshot);
    }
    if let Some(search_json) = &args.search_json {
        builder = builder.search_descriptor(search_json);
    }
    if args.respect_lock {
        builder = builder.lock_probe(LockArtifactProbe);
    }
    Ok(builder.build()?)
}

/// Resolve engine URLs; a missing descriptor only matters when engines are
/// all the user asked for.
fn engine_urls(
    descriptor: &std::path::Path,
    query: &str,
    required: bool,
) -> Result<Vec<(String, String)>> {
    let provider = match SearchTemplateProvider::load(descriptor) {
        Ok(provider) => provider,
        Err(PlacesError::SourceUnavailable { message, .. }) if !required => {
            debug!("Skipping search engines: {}", message);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(provider
        .templates_for(query)
        .map(|(name, url)| (name.to_string(), url))
        .collect())
}
