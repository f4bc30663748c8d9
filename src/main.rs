use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use quinto_scout::config::ScoutConfig;
use quinto_scout::extract::Extractor;
use quinto_scout::output::{self, RunSummary};
use quinto_scout::scrapers::{Orchestrator, QuintoAndarTransport, TracingProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quinto-scout", version, about = "QuintoAndar rental listing scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and parse every listing in a URL list, then write a CSV
    Run {
        /// File with one listing URL per line
        #[arg(short, long)]
        urls: PathBuf,

        /// Neighborhood slug used in the default output name
        #[arg(short, long, env = "QUINTO_NEIGHBORHOOD", default_value = "tatuape")]
        neighborhood: String,

        /// Output CSV (defaults to database/data/quintoandar_{neighborhood}_{timestamp}.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// JSON config file; flags below override its values
        #[arg(long, env = "QUINTO_CONFIG")]
        config: Option<PathBuf>,

        /// Maximum listings in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-attempt timeout in seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Total attempts for transient failures
        #[arg(long)]
        max_retries: Option<u32>,

        /// First backoff after a 429, in seconds
        #[arg(long)]
        rate_limit_delay: Option<f64>,
    },

    /// Parse a saved listing page and print the record as JSON
    Parse {
        /// Saved HTML file
        #[arg(long)]
        html: PathBuf,

        /// URL to attach to the record
        #[arg(long, default_value = "")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            urls,
            neighborhood,
            out,
            config,
            concurrency,
            timeout,
            max_retries,
            rate_limit_delay,
        } => {
            let mut config = match config {
                Some(path) => ScoutConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ScoutConfig::default(),
            };
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(secs) = timeout {
                config.fetch.timeout = seconds(secs, "timeout")?;
            }
            if let Some(max_retries) = max_retries {
                config.fetch.max_retries = max_retries;
            }
            if let Some(secs) = rate_limit_delay {
                config.fetch.rate_limit_base_delay = seconds(secs, "rate-limit-delay")?;
            }
            config.validate()?;

            let out = out.unwrap_or_else(|| output::default_csv_path(&neighborhood, Local::now()));
            cmd_run(&urls, &out, &config).await?;
        }
        Commands::Parse { html, url } => cmd_parse(&html, &url)?,
    }

    Ok(())
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("Invalid --{} value: {}", flag, value))
}

async fn cmd_run(urls_path: &Path, out: &Path, config: &ScoutConfig) -> Result<()> {
    info!("🏠 Quinto Scout - QuintoAndar listing scraper");
    info!("==========================================");

    let urls = output::load_urls(urls_path)?;
    if urls.is_empty() {
        warn!("No URLs to process");
        return Ok(());
    }

    let transport = QuintoAndarTransport::new(&config.fetch)?;
    let orchestrator = Orchestrator::from_config(Arc::new(transport), config);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, finishing in-flight listings");
            token.cancel();
        }
    });

    info!(
        "Fetching {} listings with concurrency {}...",
        urls.len(),
        config.concurrency
    );

    let records: Vec<_> = orchestrator
        .run(urls, &TracingProgressReporter)
        .map(|result| result.into_record())
        .collect()
        .await;

    let rows = output::write_csv(out, &records)?;
    info!("💾 Saved {} rows to {}", rows, out.display());

    let summary = RunSummary::new(&records, &orchestrator.stats().snapshot());
    info!("\n✅ Run complete\n{}", summary);

    Ok(())
}

fn cmd_parse(html_path: &Path, url: &str) -> Result<()> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;

    let record = Extractor::new()
        .extract(url, &html)
        .with_context(|| format!("Failed to parse {}", html_path.display()))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
