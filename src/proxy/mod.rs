//! Proxy module for fetching, testing and reporting on free proxies
//!
//! This module provides functionality for:
//! - Downloading proxy lists and extracting `host:port` candidates
//! - Testing candidates concurrently through an IP-echo endpoint
//! - Aggregating metrics and writing reports
//! - Rotating through validated proxies

pub mod checker;
pub mod classify;
pub mod fetcher;
pub mod geo;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pool;
pub mod report;
pub mod transport;

pub use checker::{ProxyTester, TesterConfig};
pub use fetcher::{FetchOutcome, ProxySource, ProxySourceFetcher, SourceKind, SourceReport};
pub use metrics::TestMetrics;
pub use models::{AnonymityLevel, ProxyCandidate, ProxyTestResult, ProxyType};
pub use parser::ProxyParser;
pub use pool::{ProxyPool, ProxyStats, RotationStrategy};
pub use report::TestReport;
pub use transport::{
    HttpProbeClient, HttpSourceClient, ProbeClient, ProbeError, ProbeReply, SourceClient,
};
