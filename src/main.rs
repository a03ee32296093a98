use anyhow::Result;
use clap::Parser;
use log::{error, info};
use proxy_harvest::{
    persist, CandidateSource, HarvestError, PoolConfig, ScrapeSource, SourceConfig,
    ValidationPool, Validator, ValidatorConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scrapes open HTTP proxies and validates them until a target count is reached
#[derive(Parser)]
#[command(name = "proxy-harvest")]
#[command(about = "Scrapes open HTTP proxies and validates them until a target count is reached")]
struct Cli {
    /// Scrape source to fetch candidates from [proxyscrape, sslproxies, freeproxylist]
    #[arg(short, long, default_value = "proxyscrape")]
    source: String,

    /// Maximum number of valid proxies to collect
    #[arg(short, long, default_value_t = 10)]
    max: usize,

    /// Output file for valid proxies
    #[arg(short, long, default_value = "proxies.txt")]
    output: PathBuf,

    /// Number of concurrent validations
    #[arg(short = 'n', long, default_value_t = 15)]
    concurrency: usize,

    /// Connection timeout per probe in seconds
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// URL to probe through each candidate
    #[arg(long)]
    probe_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source = ScrapeSource::lookup(&cli.source).ok_or_else(|| {
        HarvestError::UnknownSource(format!(
            "{} (available: {})",
            cli.source,
            ScrapeSource::names().join(", ")
        ))
    })?;

    let start = Instant::now();

    info!("fetching candidates from {}", source.name);
    let fetcher = CandidateSource::with_config(SourceConfig::new())?;
    let candidates = fetcher.fetch(source.url).await?;
    println!("Candidates found: {}", candidates.len());

    let mut validator_config =
        ValidatorConfig::new().with_connect_timeout(Duration::from_secs(cli.timeout));
    if let Some(probe_url) = cli.probe_url {
        validator_config = validator_config.with_probe_url(probe_url);
    }

    let pool = ValidationPool::with_config(
        Arc::new(Validator::with_config(validator_config)),
        PoolConfig::new()
            .with_concurrency(cli.concurrency)
            .with_target(cli.max),
    );

    let accepted = pool.run(candidates).await?;
    println!("Valid proxies: {}", accepted.len());
    for candidate in &accepted {
        println!("  {}", candidate.url());
    }

    // Persistence failure is reported on its own; the validation result
    // above already went to the user
    if let Err(e) = persist(&accepted, &cli.output) {
        error!("{}", e);
        return Err(e.into());
    }
    println!("Saved to {:?}", cli.output);

    println!("Execution time: {:.2?}", start.elapsed());
    Ok(())
}
