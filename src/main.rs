//! Crawlspace main entry point
//!
//! This is the command-line interface for the Crawlspace crawler.

use anyhow::{Context, Result};
use clap::Parser;
use crawlspace::config::{load_config_with_hash, Config};
use crawlspace::{CrawlOptions, Crawler};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Crawlspace: a recursive web crawler
///
/// Crawlspace fetches every seed in the configuration, follows the links it
/// finds up to the configured depth, and prints a summary of what it reached.
#[derive(Parser, Debug)]
#[command(name = "crawlspace")]
#[command(version)]
#[command(about = "A recursive web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the configured crawl depth
    #[arg(long, value_name = "N")]
    depth: Option<u32>,
}

/// Totals across every seed's crawl
#[derive(Debug, Default)]
struct Summary {
    pages: usize,
    successes: usize,
    failures: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(depth) = cli.depth {
        config.crawler.depth = depth;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let started = Instant::now();
    let summary = handle_crawl(&config).await?;

    if !cli.quiet {
        println!("\n=== Crawl Summary ===");
        println!("  Seeds:     {}", config.seeds.len());
        println!("  Pages:     {}", summary.pages);
        println!("  Succeeded: {}", summary.successes);
        println!("  Failed:    {}", summary.failures);
        println!("  Elapsed:   {:.2?}", started.elapsed());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawlspace=info,warn"),
            1 => EnvFilter::new("crawlspace=debug,info"),
            2 => EnvFilter::new("crawlspace=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Crawlspace Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Depth: {}", config.crawler.depth);
    println!("  Executor: {:?}", config.crawler.executor);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Max redirects: {}", config.crawler.max_redirects);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Crawls each seed with its own crawler and tallies the outcomes
async fn handle_crawl(config: &Config) -> Result<Summary> {
    let successes = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let mut summary = Summary::default();

    for seed in &config.seeds {
        let crawler = Crawler::from_config(&config.crawler, &config.user_agent)
            .context("Failed to build HTTP client")?;

        let success_count = Arc::clone(&successes);
        let failure_count = Arc::clone(&failures);
        let options = CrawlOptions::new(seed.as_str())
            .depth(config.crawler.depth)
            .on_success(move |outcome| {
                success_count.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    "{} {}",
                    outcome.status.unwrap_or_default(),
                    outcome.url
                );
            })
            .on_failure(move |outcome| {
                failure_count.fetch_add(1, Ordering::Relaxed);
                match outcome.error {
                    Some(error) => tracing::warn!("{} failed: {}", outcome.url, error),
                    None => tracing::warn!("{} failed", outcome.url),
                }
            });

        let crawled = crawler
            .run(options)
            .await
            .with_context(|| format!("Crawl of {} failed", seed))?;

        tracing::info!("Finished {} ({} pages)", seed, crawled.len());
        summary.pages += crawled.len();
    }

    summary.successes = successes.load(Ordering::Relaxed);
    summary.failures = failures.load(Ordering::Relaxed);
    Ok(summary)
}
