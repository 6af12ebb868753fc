//! Proxy source fetcher for downloading public proxy lists
//!
//! This module provides functionality for:
//! - Downloading every configured list concurrently, each with its own timeout
//! - Extracting `host:port` candidates according to the source kind
//! - Merging and deduplicating candidates across sources

use crate::proxy::models::ProxyCandidate;
use crate::proxy::parser::ProxyParser;
use crate::proxy::transport::{HttpSourceClient, SourceClient};
use crate::Result;
use futures::future;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for each list download in seconds
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// Regex pattern to match IP:PORT patterns in text
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b")
        .expect("Invalid IP:PORT regex")
});

/// How a source lays out its proxies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Newline-delimited `host:port` lines, `#` comments allowed
    PlainList,
    /// An HTML page with addresses embedded in markup
    HtmlPage,
}

impl SourceKind {
    /// Pull candidates out of a downloaded body
    pub fn extract(&self, body: &str) -> Vec<ProxyCandidate> {
        match self {
            SourceKind::PlainList => ProxyParser::parse_string(body),
            // page text is too loose for the line parser, only IPv4:port tokens count
            SourceKind::HtmlPage => extract_with_regex(body),
        }
    }
}

/// Extract IPv4:port tokens from free text
fn extract_with_regex(content: &str) -> Vec<ProxyCandidate> {
    IP_PORT_REGEX
        .captures_iter(content)
        .filter_map(|cap| {
            let host = cap.get(1)?.as_str();
            let port = cap.get(2)?.as_str();

            let valid_octets = host
                .split('.')
                .all(|part| part.parse::<u32>().map_or(false, |n| n <= 255));
            let valid_port = port.parse::<u32>().map_or(false, |p| (1..=65535).contains(&p));
            if !valid_octets || !valid_port {
                return None;
            }

            Some(ProxyCandidate::from_parts(host, port))
        })
        .collect()
}

/// A remote list of proxies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySource {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

impl ProxySource {
    pub fn new(name: &str, url: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
        }
    }

    /// A raw GitHub list; the name is the repository path
    pub fn github(path: &str) -> Self {
        Self::new(
            path,
            &format!("https://raw.githubusercontent.com/{}", path),
            SourceKind::PlainList,
        )
    }
}

/// Result of fetching a single source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    /// Name of the source
    pub source: String,
    /// Number of candidates parsed from it, duplicates included
    pub count: usize,
    /// Error message if the download failed
    pub error: Option<String>,
}

impl SourceReport {
    pub fn success(source: String, count: usize) -> Self {
        Self {
            source,
            count,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            count: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of fetching every source
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// At least one candidate was found
    Found {
        candidates: HashSet<ProxyCandidate>,
        reports: Vec<SourceReport>,
    },
    /// No source produced a candidate
    Empty { reports: Vec<SourceReport> },
}

impl FetchOutcome {
    pub fn reports(&self) -> &[SourceReport] {
        match self {
            FetchOutcome::Found { reports, .. } | FetchOutcome::Empty { reports } => reports,
        }
    }

    /// Candidates as a list; empty for [`FetchOutcome::Empty`]
    pub fn into_candidates(self) -> Vec<ProxyCandidate> {
        match self {
            FetchOutcome::Found { candidates, .. } => candidates.into_iter().collect(),
            FetchOutcome::Empty { .. } => Vec::new(),
        }
    }

    /// Source reports sorted by candidate count, largest first
    pub fn ranked_reports(&self) -> Vec<&SourceReport> {
        let mut ranked: Vec<_> = self.reports().iter().filter(|r| r.is_success()).collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

/// Downloads and merges proxy lists
pub struct ProxySourceFetcher {
    sources: Vec<ProxySource>,
    timeout: Duration,
    client: Arc<dyn SourceClient>,
}

impl ProxySourceFetcher {
    /// Fetcher over custom sources backed by reqwest
    pub fn with_sources(sources: Vec<ProxySource>, timeout: Duration) -> Result<Self> {
        let transport = HttpSourceClient::new(timeout)?;
        Ok(Self::with_client(sources, timeout, Arc::new(transport)))
    }

    pub fn with_client(
        sources: Vec<ProxySource>,
        timeout: Duration,
        client: Arc<dyn SourceClient>,
    ) -> Self {
        Self {
            sources,
            timeout,
            client,
        }
    }

    /// Fetch a single source, bounded by the fetcher timeout
    pub async fn fetch_source(&self, source: &ProxySource) -> Result<Vec<ProxyCandidate>> {
        let body = tokio::time::timeout(self.timeout, self.client.fetch_text(&source.url))
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {:?}", self.timeout))??;
        Ok(source.kind.extract(&body))
    }

    /// Fetch every source concurrently and merge the candidates.
    ///
    /// A failing source is logged and contributes nothing.
    pub async fn fetch_all(&self) -> FetchOutcome {
        info!("Fetching proxies from {} sources...", self.sources.len());

        let fetched = future::join_all(
            self.sources
                .iter()
                .map(|source| async move { (source, self.fetch_source(source).await) }),
        )
        .await;

        let mut candidates = HashSet::new();
        let mut reports = Vec::with_capacity(fetched.len());
        for (index, (source, outcome)) in fetched.into_iter().enumerate() {
            match outcome {
                Ok(proxies) => {
                    if proxies.is_empty() {
                        info!("  Source {}: No proxies found ({})", index + 1, source.name);
                    } else {
                        info!("  Source {}: {} proxies ({})", index + 1, proxies.len(), source.name);
                    }
                    reports.push(SourceReport::success(source.name.clone(), proxies.len()));
                    candidates.extend(proxies);
                }
                Err(e) => {
                    warn!("Error fetching from {}: {}", source.url, e);
                    reports.push(SourceReport::failure(source.name.clone(), e.to_string()));
                }
            }
        }

        info!("Total unique proxies: {}", candidates.len());
        if candidates.is_empty() {
            FetchOutcome::Empty { reports }
        } else {
            FetchOutcome::Found {
                candidates,
                reports,
            }
        }
    }

    /// Frequently refreshed raw GitHub proxy lists
    pub fn default_sources() -> Vec<ProxySource> {
        [
            "themiralay/Proxy-List-World/master/proxy-list.txt",
            "Mohammedcha/ProxRipper/main/proxies.txt",
            "saschazesiger/Free-Proxies/master/proxies.txt",
            "TheSpeedX/PROXY-List/master/http.txt",
            "clarketm/proxy-list/master/proxy-list.txt",
            "jetkai/proxy-list/main/online-proxies/txt/proxies-http.txt",
            "monosans/proxy-list/main/proxies/http.txt",
            "ShiftyTR/Proxy-List/master/http.txt",
            "hookzof/socks5_list/master/proxies.txt",
            "roosterkid/openproxylist/main/http.txt",
        ]
        .into_iter()
        .map(ProxySource::github)
        .collect()
    }

    /// Free proxy websites that publish HTML tables
    pub fn html_sources() -> Vec<ProxySource> {
        vec![
            ProxySource::new(
                "free-proxy-list.net",
                "https://free-proxy-list.net/",
                SourceKind::HtmlPage,
            ),
            ProxySource::new("sslproxies", "https://www.sslproxies.org/", SourceKind::HtmlPage),
            ProxySource::new("us-proxy.org", "https://www.us-proxy.org/", SourceKind::HtmlPage),
            ProxySource::new(
                "socks-proxy.net",
                "https://www.socks-proxy.net/",
                SourceKind::HtmlPage,
            ),
        ]
    }
}
