//! Proxy Tester - Free Proxy Fetcher and Validator
//!
//! Downloads public proxy lists, validates every candidate concurrently
//! through an IP-echo endpoint and reports aggregate metrics.

pub mod pipeline;
pub mod proxy;

pub use proxy::*;

use std::path::PathBuf;
use std::time::Duration;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on simultaneously running probes
    pub max_concurrent: usize,
    /// Per-probe deadline
    pub timeout: Duration,
    /// Per-source download deadline
    pub source_timeout: Duration,
    /// JSON results file
    pub results_path: PathBuf,
    /// Plain-text working proxies file
    pub working_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: proxy::checker::DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs_f64(proxy::checker::DEFAULT_TIMEOUT_SECS),
            source_timeout: Duration::from_secs(proxy::fetcher::DEFAULT_SOURCE_TIMEOUT_SECS),
            results_path: PathBuf::from(proxy::report::DEFAULT_RESULTS_FILE),
            working_path: PathBuf::from(proxy::report::DEFAULT_WORKING_FILE),
        }
    }
}

impl Config {
    /// Tester configuration derived from this config
    pub fn tester_config(&self) -> TesterConfig {
        TesterConfig::new()
            .with_max_concurrent(self.max_concurrent)
            .with_timeout(self.timeout)
    }
}
