use crawl_frontier::cli::{Cli, Commands};
use crawl_frontier::config::{ConfigError, FrontierConfig};
use crawl_frontier::docid::{DocIdRegistry, InMemoryDocIds};
use crawl_frontier::frontier::Frontier;
use crawl_frontier::logging::{self, LogGuards, LoggingError};
use crawl_frontier::models::UrlRecord;
use crawl_frontier::scheduler::{self, DiscoveredLink};
use crawl_frontier::store::{CrawlStore, StoreError};
use crawl_frontier::url_utils;
use std::io::Write;
use std::process::ExitCode;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl From<LoggingError> for MainError {
    fn from(err: LoggingError) -> Self {
        MainError::Logging(err.to_string())
    }
}

impl MainError {
    fn exit_code(&self) -> u8 {
        match self {
            MainError::InvalidUrl(_) => 2,
            _ => 1,
        }
    }
}

/// File config first, then command-line overrides. Without a file the CLI
/// defaults to a resumable frontier.
fn build_config(cli: &Cli) -> Result<FrontierConfig, MainError> {
    let mut config = match &cli.config {
        Some(path) => FrontierConfig::from_json_file(path)?,
        None => FrontierConfig {
            resumable: true,
            ..FrontierConfig::default()
        },
    };

    if let Some(dir) = &cli.data_dir {
        config.storage_folder = dir.clone();
    }
    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if cli.volatile {
        config.resumable = false;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(cli: &Cli) -> Result<Option<LogGuards>, MainError> {
    match &cli.log_dir {
        Some(dir) => Ok(Some(logging::init_logging(dir)?)),
        None => {
            logging::init_stderr_logging()?;
            Ok(None)
        }
    }
}

fn open_frontier(cli: &Cli, config: &FrontierConfig) -> Result<(CrawlStore, Frontier), MainError> {
    let store = if cli.fresh {
        CrawlStore::open_fresh(config)?
    } else {
        CrawlStore::open(config)?
    };
    let frontier = store.open_frontier(&config.region)?;
    Ok((store, frontier))
}

fn run_frontier_command(
    command: Commands,
    frontier: &Frontier,
    config: &FrontierConfig,
) -> Result<(), MainError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Enqueue {
            url,
            docid,
            priority,
            depth,
            parent_docid,
            base,
        } => {
            let canonical = url_utils::canonicalize(&url, base.as_deref())
                .ok_or_else(|| MainError::InvalidUrl(url.clone()))?;

            let mut record = UrlRecord::new(url, canonical, docid)
                .with_priority(priority)
                .with_depth(depth);
            record.parent_docid = parent_docid;

            frontier.enqueue(&record)?;
            writeln!(out, "{}\t{}", record.key(), record.canonical_url)?;
        }
        Commands::Schedule {
            parent,
            parent_docid,
            parent_depth,
            priority,
            first_docid,
            links,
        } => {
            let canonical = url_utils::canonicalize_url(&parent)
                .ok_or_else(|| MainError::InvalidUrl(parent.clone()))?;
            let parent = UrlRecord::new(parent, canonical, parent_docid)
                .with_priority(priority)
                .with_depth(parent_depth);

            // The parent is already known; links back to it are duplicates.
            let registry = InMemoryDocIds::starting_at(first_docid);
            registry.assign(&parent.canonical_url);

            let links: Vec<DiscoveredLink> = links.into_iter().map(DiscoveredLink::new).collect();
            let report =
                scheduler::schedule_links(frontier, &registry, &parent, &links, config.max_depth)?;
            writeln!(out, "{}", report)?;
        }
        Commands::Peek { max } => {
            let records = frontier.peek_batch(max.unwrap_or(config.batch_size))?;
            for record in &records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
        }
        Commands::Delete { count } => {
            let removed = frontier.delete_batch(count.unwrap_or(config.batch_size))?;
            writeln!(out, "{}", removed)?;
        }
        Commands::Len => {
            writeln!(out, "{}", frontier.length())?;
        }
        Commands::Stats => {
            writeln!(out, "{}", frontier.stats())?;
        }
        // Handled before the store is opened.
        Commands::Canonicalize { .. } => {}
    }

    Ok(())
}

fn run(cli: Cli) -> Result<(), MainError> {
    let _guards = init_logging(&cli)?;

    if let Commands::Canonicalize { reference, base } = &cli.command {
        let canonical = url_utils::canonicalize(reference, base.as_deref())
            .ok_or_else(|| MainError::InvalidUrl(reference.clone()))?;
        println!("{}", canonical);
        return Ok(());
    }

    let config = build_config(&cli)?;
    let (_store, frontier) = open_frontier(&cli, &config)?;

    let result = run_frontier_command(cli.command, &frontier, &config);
    frontier.close();
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
