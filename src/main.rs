use chrono::Utc;
use clap::{Parser, Subcommand};
use provider_search::config::Settings;
use provider_search::core::{EngineOptions, FacetDimension, ProfileQuery, SearchEngine};
use provider_search::models::{FilterCriteria, GeoPoint, ProfileId, SearchRequest};
use provider_search::services::{InMemoryStore, PostgresStore, ProfileStore, StoreError};
use provider_search::SearchError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "provider-search")]
#[command(about = "Search, rank and facet service provider profiles")]
struct Cli {
    /// Configuration file, replaces config/default and config/local
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON fixture with candidate records, used instead of PostgreSQL
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full search and print one page of results
    Search {
        /// Request as JSON, or @path to a JSON file
        #[arg(short, long)]
        request: Option<String>,

        /// Free text query, overrides the request's query
        #[arg(short, long)]
        query: Option<String>,

        /// Sort key, overrides the request's sort
        #[arg(short, long)]
        sort: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Search with the advanced filters enabled
    Advanced {
        /// Filter criteria as JSON, or @path to a JSON file
        #[arg(long)]
        filters: Option<String>,

        #[arg(short, long, default_value = "relevance")]
        sort: String,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Relevance-ranked quick lookup by text
    Quick {
        #[arg(short, long)]
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Specialty and name suggestions containing the query
    Autocomplete {
        #[arg(short, long)]
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Profiles similar to a given profile
    Similar {
        #[arg(long)]
        id: ProfileId,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Profile ids to leave out, comma separated
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ProfileId>,
    },
    /// Profiles within a radius of a point, nearest first
    Geo {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Radius in kilometres
        #[arg(short, long, default_value = "10")]
        radius: f64,

        /// Filter criteria as JSON, or @path to a JSON file
        #[arg(long)]
        filters: Option<String>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Facet counts for a text query
    Facets {
        #[arg(short, long, default_value = "")]
        query: String,

        /// Dimensions to compute, comma separated; all when omitted
        #[arg(long, value_delimiter = ',')]
        facets: Vec<String>,
    },
    /// Run a search and export the page as csv or json
    Export {
        #[arg(long, default_value = "csv")]
        format: String,

        /// Request as JSON, or @path to a JSON file
        #[arg(short, long)]
        request: Option<String>,
    },
    /// Synonym suggestions for a query
    Related {
        #[arg(short, long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    init_logging(&settings);

    let (engine, base) = match &cli.fixture {
        Some(path) => {
            let store = InMemoryStore::from_json_file(path)?;
            prepare(&store, &settings).await?
        }
        None => {
            let store = PostgresStore::from_settings(&settings.database).await?;
            prepare(&store, &settings).await?
        }
    };

    match cli.command {
        Commands::Search {
            request,
            query,
            sort,
            page,
            per_page,
        } => {
            let mut request: SearchRequest = parse_arg(request.as_deref())?;
            if query.is_some() {
                request.query = query;
            }
            if let Some(sort) = sort {
                request.sort.key = sort.parse().unwrap_or_default();
            }
            request.page = page.or(request.page);
            request.per_page = per_page.or(request.per_page);
            print_json(&engine.search(base, &request))
        }
        Commands::Advanced {
            filters,
            sort,
            page,
            per_page,
        } => {
            let criteria: FilterCriteria = parse_arg(filters.as_deref())?;
            print_json(&engine.advanced_search(base, &criteria, &sort, page, per_page))
        }
        Commands::Quick { query, limit } => print_json(&engine.quick_search(base, &query, limit)),
        Commands::Autocomplete { query, limit } => {
            print_json(&engine.autocomplete(base, &query, limit))
        }
        Commands::Similar { id, limit, exclude } => {
            print_json(&engine.find_similar(base, id, limit, &exclude))
        }
        Commands::Geo {
            lat,
            lng,
            radius,
            filters,
            limit,
        } => {
            let criteria: FilterCriteria = parse_arg(filters.as_deref())?;
            let results = engine.geo_search(base, GeoPoint::new(lat, lng), radius, &criteria, limit)?;
            print_json(&results)
        }
        Commands::Facets { query, facets } => {
            let dimensions = parse_dimensions(&facets);
            print_json(&engine.faceted_search(base, &query, &dimensions))
        }
        Commands::Export { format, request } => {
            let request: SearchRequest = parse_arg(request.as_deref())?;
            let page = engine.search(base, &request);
            println!("{}", engine.export(&page.items, &format)?);
            Ok(())
        }
        Commands::Related { query } => print_json(&engine.related_queries(&query)),
    }
}

/// LOG_LEVEL and LOG_FORMAT override the logging section; RUST_LOG wins over both
fn init_logging(settings: &Settings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format =
        std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn prepare<S: ProfileStore>(
    store: &S,
    settings: &Settings,
) -> Result<(SearchEngine, ProfileQuery), CliError> {
    let mut options = EngineOptions::from(settings);
    if let Some(tree) = store.load_category_tree().await? {
        options = options.with_category_tree(tree);
    }

    let engine = SearchEngine::new(options);
    let base = engine.load_base(store, Utc::now()).await?;
    info!("Search engine ready with {} candidates", base.len());
    Ok((engine, base))
}

/// Inline JSON, `@path` to a JSON file, or the type's default when absent
fn parse_arg<T: DeserializeOwned + Default>(raw: Option<&str>) -> Result<T, CliError> {
    match raw {
        None => Ok(T::default()),
        Some(raw) => match raw.strip_prefix('@') {
            Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
            None => Ok(serde_json::from_str(raw)?),
        },
    }
}

fn parse_dimensions(names: &[String]) -> Vec<FacetDimension> {
    names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .filter_map(|name| match name.parse() {
            Ok(dimension) => Some(dimension),
            Err(e) => {
                warn!("Skipping facet: {}", e);
                None
            }
        })
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
