//! Nyaa-Harvest main entry point
//!
//! Command-line interface for running pooled searches against the index.

use anyhow::{Context, Result};
use clap::Parser;
use nyaa_harvest::config::{load_config_with_hash, validate, Config};
use nyaa_harvest::extract::DetailOptions;
use nyaa_harvest::model::{AggregatedResult, DetailRecord};
use nyaa_harvest::search::{build_search_url, Filter, FilterParams};
use nyaa_harvest::{Harvester, SearchOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Nyaa-Harvest: pooled, rate-limit aware listing harvester
///
/// Fetches search listings (and optionally every torrent's detail page)
/// through a fixed pool of workers, backing off whenever the site answers
/// with HTTP 429.
#[derive(Parser, Debug)]
#[command(name = "nyaa-harvest")]
#[command(version)]
#[command(about = "Pooled, rate-limit aware listing harvester", long_about = None)]
struct Cli {
    /// Search text
    #[arg(value_name = "QUERY", required_unless_present = "view")]
    query: Option<String>,

    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Category path, e.g. "anime" or "anime.english_translated"
    #[arg(long)]
    category: Option<String>,

    /// Uploader filter: none, no-remakes or trusted
    #[arg(long, default_value = "none")]
    filter: Filter,

    /// First page to fetch
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Number of consecutive pages to fetch
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Fetch only this page
    #[arg(long, value_name = "PAGE", conflicts_with_all = ["start_page", "pages"])]
    only_page: Option<u32>,

    /// Load every record's detail page using the [details] mask
    #[arg(long)]
    details: bool,

    /// Append N further pages after the initial search
    #[arg(long, value_name = "N", default_value_t = 0)]
    more: u32,

    /// Load a single detail page by id or view URL instead of searching
    #[arg(long, value_name = "ID", conflicts_with_all = ["details", "more"])]
    view: Option<String>,

    /// Override the number of workers
    #[arg(short, long)]
    concurrency: Option<u32>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Validate config and show the URLs that would be fetched
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    if let Some(concurrency) = cli.concurrency {
        config.pool.concurrency = concurrency;
        validate(&config).context("invalid --concurrency")?;
    }

    let options = search_options(&cli, &config);

    if cli.dry_run {
        return handle_dry_run(&cli, &config, &options);
    }

    let harvester = Harvester::new(config);
    harvester
        .initialize()
        .await
        .context("failed to initialize worker pool")?;

    let outcome = tokio::select! {
        result = run(&cli, &harvester, options) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, shutting down");
            Ok(())
        }
    };

    harvester.shutdown().await;
    outcome
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("nyaa_harvest=info,warn"),
            1 => EnvFilter::new("nyaa_harvest=debug,info"),
            2 => EnvFilter::new("nyaa_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn search_options(cli: &Cli, config: &Config) -> SearchOptions {
    let filter = FilterParams::new(cli.category.clone(), cli.filter);
    let details = cli.details.then(|| DetailOptions::from(&config.details));

    let options = SearchOptions::default()
        .with_filter(filter)
        .with_details(details);

    match cli.only_page {
        Some(page) => options.only_page(page),
        None => options.with_pages(cli.start_page, cli.pages),
    }
}

async fn run(cli: &Cli, harvester: &Harvester, options: SearchOptions) -> Result<()> {
    if let Some(identifier) = &cli.view {
        let detail = harvester
            .details(identifier, None)
            .await
            .with_context(|| format!("failed to load detail page for {}", identifier))?;
        return print_detail(&detail, cli.json);
    }

    let query = cli.query.as_deref().unwrap_or_default();
    let mut cursor = harvester
        .search(query, options)
        .await
        .with_context(|| format!("search for '{}' failed", query))?;

    for _ in 0..cli.more {
        if !cursor.has_next_page() {
            tracing::info!("No further pages");
            break;
        }
        cursor.add_next_page(1).await.context("failed to load next page")?;
    }

    let data = cursor.into_data();
    print_results(&data, cli.json)
}

fn print_results(data: &AggregatedResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
        return Ok(());
    }

    for record in &data.records {
        println!(
            "{:>8}  {:<10}  S:{:<5} L:{:<5}  {}",
            record.id, record.size, record.stats.seeders, record.stats.leechers, record.name
        );
        if let Some(submitter) = record.details.as_ref().and_then(|d| d.submitter.as_ref()) {
            println!("{:>8}  by {}", "", submitter.name);
        }
    }

    let metadata = &data.metadata;
    println!(
        "\n{} records, page {} of {}{} ({}ms)",
        data.count,
        metadata.current,
        metadata.total,
        if metadata.has_next_page { ", more available" } else { "" },
        metadata.time_taken_ms
    );
    Ok(())
}

fn print_detail(detail: &DetailRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(detail)?);
        return Ok(());
    }

    if let Some(submitter) = &detail.submitter {
        println!("Submitter: {} ({})", submitter.name, submitter.url);
    }
    if let Some(information) = &detail.information {
        println!("Information: {}", information);
    }
    if let Some(files) = &detail.files {
        println!("Files: {}", files.len());
    }
    if let Some(comments) = &detail.comments {
        println!("Comments: {}", comments.len());
    }
    if let Some(description) = &detail.description {
        println!("\n{}", description);
    }
    Ok(())
}

/// Handles the --dry-run mode: shows resolved settings and target URLs
fn handle_dry_run(cli: &Cli, config: &Config, options: &SearchOptions) -> Result<()> {
    println!("=== Nyaa-Harvest Dry Run ===\n");

    println!("Pool:");
    println!("  Runtime: {}", config.pool.runtime);
    println!("  Workers: {}", config.pool.concurrency);
    println!("  Cooldown: {}ms", config.pool.cooldown_ms);

    println!("\nRetry:");
    match config.retry.max_attempts() {
        Some(attempts) => println!("  Max attempts: {}", attempts),
        None => println!("  Max attempts: unbounded"),
    }
    println!("  Max backoff: {}ms", config.retry.max_backoff_ms);
    println!("  Request timeout: {}ms", config.retry.request_timeout_ms);

    let base = Url::parse(&config.site.base_url).context("invalid base URL")?;

    if let Some(identifier) = &cli.view {
        let id = nyaa_harvest::search::parse_identifier(identifier)?;
        let url = nyaa_harvest::search::build_view_url(&base, id)?;
        println!("\nWould load detail page:\n  {}", url);
        return Ok(());
    }

    let query = cli.query.as_deref().unwrap_or_default();
    println!("\nWould fetch:");
    for page in options.pages() {
        println!("  {}", build_search_url(&base, query, &options.filter, page)?);
    }
    if options.details.is_some() {
        println!("  + one detail page per record");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}
