use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use proxy_tester::{
    pipeline::{self, RunOutcome},
    proxy::{
        checker::{DEFAULT_MAX_CONCURRENT, DEFAULT_TEST_URL, DEFAULT_TIMEOUT_SECS},
        fetcher::DEFAULT_SOURCE_TIMEOUT_SECS,
        report::{DEFAULT_RESULTS_FILE, DEFAULT_WORKING_FILE},
        transport::PROBE_USER_AGENT,
        FetchOutcome, ProxyParser, ProxyPool, ProxySourceFetcher, ProxyTester, RotationStrategy,
        TestReport,
    },
    Config,
};
use std::path::PathBuf;
use std::time::Duration;

/// Fetch free proxy lists and validate them concurrently
#[derive(Parser)]
#[command(name = "proxy-tester")]
#[command(about = "Fetch free proxy lists and validate them concurrently")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Probe settings shared by `run` and `check`
#[derive(clap::Args, Clone)]
struct ProbeArgs {
    /// Maximum number of probes in flight
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    concurrency: usize,
    /// Per-probe timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: f64,
    /// IP-echo URL requested through each proxy
    #[arg(long, default_value = DEFAULT_TEST_URL)]
    test_url: String,
    /// User agent sent through each proxy
    #[arg(long, default_value = PROBE_USER_AGENT)]
    user_agent: String,
    /// MaxMind City database for country and city lookups
    #[arg(long)]
    mmdb: Option<String>,
    /// JSON results file
    #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
    results: PathBuf,
    /// Working proxies file
    #[arg(long, default_value = DEFAULT_WORKING_FILE)]
    working: PathBuf,
}

impl Default for ProbeArgs {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_MAX_CONCURRENT,
            timeout: DEFAULT_TIMEOUT_SECS,
            test_url: DEFAULT_TEST_URL.to_string(),
            user_agent: PROBE_USER_AGENT.to_string(),
            mmdb: None,
            results: PathBuf::from(DEFAULT_RESULTS_FILE),
            working: PathBuf::from(DEFAULT_WORKING_FILE),
        }
    }
}

/// Source settings shared by `run` and `fetch`
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Also scrape the free-proxy-list HTML pages
    #[arg(long)]
    html_sources: bool,
    /// Timeout in seconds for each list download
    #[arg(long, default_value_t = DEFAULT_SOURCE_TIMEOUT_SECS)]
    source_timeout: u64,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            html_sources: false,
            source_timeout: DEFAULT_SOURCE_TIMEOUT_SECS,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, test, report and save (default)
    Run {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Fetch and deduplicate candidates without testing them
    Fetch {
        #[command(flatten)]
        sources: SourceArgs,
        /// Output file for candidates
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Test candidates from a file
    Check {
        /// Input file containing host:port lines
        input: PathBuf,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Pick proxies from a saved results file
    Pick {
        /// JSON results file written by `run` or `check`
        #[arg(default_value = DEFAULT_RESULTS_FILE)]
        input: PathBuf,
        /// Rotation strategy (sequential, random, weighted, fastest)
        #[arg(short, long, default_value = "weighted")]
        strategy: String,
        /// Number of proxies to pick
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { sources, probe }) => run(sources, probe).await?,
        None => run(SourceArgs::default(), ProbeArgs::default()).await?,
        Some(Commands::Fetch { sources, output }) => {
            let fetcher = build_fetcher(
                sources.html_sources,
                Duration::from_secs(sources.source_timeout),
            )?;
            match fetcher.fetch_all().await {
                FetchOutcome::Empty { .. } => warn!("No proxies found from any source"),
                outcome => {
                    let mut candidates = outcome.into_candidates();
                    candidates.sort();
                    if let Some(output_path) = output {
                        ProxyParser::save_to_file(&candidates, &output_path)?;
                        println!("Saved {} proxies to {:?}", candidates.len(), output_path);
                    } else {
                        for proxy in &candidates {
                            println!("{}", proxy);
                        }
                    }
                }
            }
        }
        Some(Commands::Check { input, probe }) => {
            let mut candidates = ProxyParser::parse_file(&input)?;
            candidates.sort();
            candidates.dedup();
            info!("Loaded {} proxies from {:?}", candidates.len(), input);

            if candidates.is_empty() {
                warn!("Nothing to test");
                return Ok(());
            }

            let config = config_from(&probe, &SourceArgs::default())?;
            let tester = build_tester(&probe, &config);
            pipeline::test_and_report(&tester, candidates, &config).await;
        }
        Some(Commands::Pick {
            input,
            strategy,
            count,
        }) => {
            let strategy: RotationStrategy = strategy.parse()?;
            let report = TestReport::load(&input)?;
            let mut pool = ProxyPool::from_results(&report.results);

            if pool.is_empty() {
                warn!("No working proxies in {:?}", input);
                return Ok(());
            }
            for _ in 0..count {
                if let Some(proxy) = pool.next(&strategy) {
                    println!("{}", proxy);
                }
            }
        }
    }

    Ok(())
}

async fn run(sources: SourceArgs, probe: ProbeArgs) -> Result<()> {
    let config = config_from(&probe, &sources)?;
    let fetcher = build_fetcher(sources.html_sources, config.source_timeout)?;
    let tester = build_tester(&probe, &config);

    match pipeline::run(&fetcher, &tester, &config).await {
        RunOutcome::NoCandidates { reports } => {
            let failed = reports.iter().filter(|r| !r.is_success()).count();
            error!(
                "No proxies found from any source ({} of {} sources failed)",
                failed,
                reports.len()
            );
        }
        RunOutcome::Completed(run) => {
            info!(
                "Testing complete: {}/{} working",
                run.metrics.working_count, run.metrics.total_tested
            );
        }
    }
    Ok(())
}

fn config_from(probe: &ProbeArgs, sources: &SourceArgs) -> Result<Config> {
    let timeout = Duration::try_from_secs_f64(probe.timeout)
        .map_err(|_| anyhow!("Invalid timeout: {}", probe.timeout))?;

    Ok(Config {
        max_concurrent: probe.concurrency,
        timeout,
        source_timeout: Duration::from_secs(sources.source_timeout),
        results_path: probe.results.clone(),
        working_path: probe.working.clone(),
    })
}

fn build_fetcher(html_sources: bool, timeout: Duration) -> Result<ProxySourceFetcher> {
    let mut list = ProxySourceFetcher::default_sources();
    if html_sources {
        list.extend(ProxySourceFetcher::html_sources());
    }
    ProxySourceFetcher::with_sources(list, timeout)
}

fn build_tester(probe: &ProbeArgs, config: &Config) -> ProxyTester {
    let mut tester_config = config
        .tester_config()
        .with_test_url(probe.test_url.clone())
        .with_user_agent(probe.user_agent.clone());
    if let Some(path) = &probe.mmdb {
        tester_config = tester_config.with_mmdb_path(path.clone());
    }
    ProxyTester::with_config(tester_config)
}
