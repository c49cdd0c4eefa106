use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use diffstat_client::{
    ListingSource, PageStore, ReqwestFetcher, RowView, ScraperExtractor, fragment_text,
};
use diffstat_core::{CycleReport, EnrichService, PollConfig, SchedulerConfig, TracingReporter};

#[derive(Parser)]
#[command(name = "diffstat", version, about = "Annotate pull-request listings with diffstats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a listing page's rows, then fetch every row's diffstat
    Enrich {
        /// Pull-request listing URL (e.g. https://github.com/owner/repo/pulls)
        #[arg(short, long)]
        url: String,

        /// Base URL for relative pull-request links (defaults to the listing's origin)
        #[arg(short, long, env = "DIFFSTAT_BASE_URL")]
        base_url: Option<String>,

        /// Bearer token sent with every request
        #[arg(short, long, env = "DIFFSTAT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Print the cycle report and rows as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        poll: PollArgs,

        #[command(flatten)]
        scheduler: SchedulerArgs,
    },
}

#[derive(Args)]
struct PollArgs {
    /// Settle time before the first readiness check
    #[arg(long, default_value_t = 300)]
    initial_delay_ms: u64,

    /// Wait between readiness checks
    #[arg(long, default_value_t = 500)]
    retry_interval_ms: u64,

    /// Maximum number of readiness checks
    #[arg(long, default_value_t = 20)]
    max_retries: u32,

    /// Give up waiting for rows after this long
    #[arg(long, default_value_t = 10_000)]
    max_wait_ms: u64,
}

impl PollArgs {
    fn to_config(&self) -> PollConfig {
        PollConfig::default()
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_retry_interval(Duration::from_millis(self.retry_interval_ms))
            .with_max_retries(self.max_retries)
            .with_max_wait_time(Duration::from_millis(self.max_wait_ms))
    }
}

#[derive(Args)]
struct SchedulerArgs {
    /// Maximum simultaneous pull-request fetches
    #[arg(long, env = "DIFFSTAT_MAX_CONCURRENT", default_value_t = 5)]
    max_concurrent: usize,

    /// Pause between admission rounds while work remains
    #[arg(long, default_value_t = 200)]
    request_delay_ms: u64,

    /// Per-fetch deadline in seconds (0 disables it)
    #[arg(long, default_value_t = 30)]
    fetch_timeout_secs: u64,
}

impl SchedulerArgs {
    fn to_config(&self) -> SchedulerConfig {
        let fetch_timeout =
            (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs));
        SchedulerConfig::default()
            .with_max_concurrent(self.max_concurrent)
            .with_request_delay(Duration::from_millis(self.request_delay_ms))
            .with_fetch_timeout(fetch_timeout)
    }
}

#[derive(Serialize)]
struct EnrichOutput<'a> {
    report: &'a CycleReport,
    rows: &'a [RowView],
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("diffstat_core=info".parse()?)
                .add_directive("diffstat_client=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Enrich {
            url,
            base_url,
            token,
            json,
            poll,
            scheduler,
        } => {
            let base_url = match base_url {
                Some(base) => base,
                None => origin_of(&url)?,
            };
            cmd_enrich(
                &url,
                &base_url,
                token,
                poll.to_config(),
                scheduler.to_config(),
                json,
            )
            .await?;
        }
    }

    Ok(())
}

/// Scheme, host and port of `url`, used as the default base URL.
fn origin_of(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid listing URL: {url}"))?;
    Ok(parsed.origin().ascii_serialization())
}

async fn cmd_enrich(
    url: &str,
    base_url: &str,
    token: Option<String>,
    poll_config: PollConfig,
    scheduler_config: SchedulerConfig,
    json: bool,
) -> Result<()> {
    let mut fetcher = ReqwestFetcher::new()
        .context("Failed to create HTTP client")?
        .with_base_url(base_url)
        .context("Invalid base URL")?;
    if let Some(token) = token {
        fetcher = fetcher.with_token(token);
    }

    let source =
        ListingSource::new(fetcher.clone(), url).context("Failed to build listing parser")?;
    let extractor = ScraperExtractor::new().context("Failed to build diffstat extractor")?;
    let store = PageStore::new();

    let service = EnrichService::new(
        source,
        fetcher,
        extractor,
        store.clone(),
        poll_config,
        scheduler_config,
    )
    .context("Invalid polling or scheduling configuration")?;

    tracing::info!("Waiting for rows on {}", url);
    let report = service.run_cycle(&TracingReporter).await;
    let rows = store.snapshot();

    if json {
        let output = EnrichOutput {
            report: &report,
            rows: &rows,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &report {
        CycleReport::Ready { .. } => print_rows(&rows),
        CycleReport::ExhaustedRetries { attempts } => {
            println!("No rows appeared after {attempts} checks");
        }
        CycleReport::ExhaustedTime { elapsed_ms, .. } => {
            println!("No rows appeared within {elapsed_ms}ms");
        }
    }

    Ok(())
}

fn print_rows(rows: &[RowView]) {
    for row in rows {
        let Some(title) = &row.title else {
            continue;
        };
        let marker = if row.approved { "✔" } else { " " };
        let stat = row
            .diffstat
            .as_deref()
            .map(fragment_text)
            .unwrap_or_else(|| "-".to_string());
        println!("{marker} {title:<60} {stat}");
    }
}
