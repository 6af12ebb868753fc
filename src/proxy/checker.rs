//! Proxy tester module for validating candidates concurrently

use crate::proxy::classify;
use crate::proxy::geo::GeoLocator;
use crate::proxy::models::{ProxyCandidate, ProxyTestResult};
use crate::proxy::transport::{HttpProbeClient, ProbeClient, ProbeError, PROBE_USER_AGENT};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Default per-probe deadline in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Default number of probes in flight
pub const DEFAULT_MAX_CONCURRENT: usize = 50;

/// Default IP-echo endpoint
pub const DEFAULT_TEST_URL: &str = "http://httpbin.org/ip";

/// Log a progress line every this many completed probes
const PROGRESS_EVERY: usize = 10;

/// Configuration for the proxy tester
#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// Deadline for each probe
    pub timeout: Duration,
    /// Upper bound on simultaneously running probes
    pub max_concurrent: usize,
    /// IP-echo endpoint requested through each proxy
    pub test_url: String,
    /// User agent sent through the proxy
    pub user_agent: String,
    /// Path to MMDB file for geolocation (optional)
    pub mmdb_path: Option<String>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            test_url: DEFAULT_TEST_URL.to_string(),
            user_agent: PROBE_USER_AGENT.to_string(),
            mmdb_path: None,
        }
    }
}

impl TesterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A zero width is raised to one so the batch always makes progress
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_mmdb_path(mut self, path: String) -> Self {
        self.mmdb_path = Some(path);
        self
    }
}

/// Validates proxy candidates through an IP-echo endpoint
#[derive(Clone)]
pub struct ProxyTester {
    config: TesterConfig,
    client: Arc<dyn ProbeClient>,
    geo_locator: Option<GeoLocator>,
}

impl ProxyTester {
    /// Create a tester backed by reqwest
    pub fn with_config(config: TesterConfig) -> Self {
        let client = HttpProbeClient::new(config.user_agent.clone());
        Self::with_client(config, Arc::new(client))
    }

    /// Create a tester using a custom probe client
    pub fn with_client(config: TesterConfig, client: Arc<dyn ProbeClient>) -> Self {
        let geo_locator = config.mmdb_path.as_ref().and_then(|path| {
            GeoLocator::from_path(path)
                .map_err(|e| warn!("Geolocation disabled, cannot open {}: {}", path, e))
                .ok()
        });

        Self {
            config,
            client,
            geo_locator,
        }
    }

    /// Probe a single candidate. Never fails: every anticipated error becomes
    /// a failed result carrying a short message.
    pub async fn test_one(&self, proxy: &ProxyCandidate) -> ProxyTestResult {
        let start = Instant::now();

        let outcome = tokio::time::timeout(
            self.config.timeout,
            self.client
                .probe(proxy, &self.config.test_url, self.config.timeout),
        )
        .await;

        match outcome {
            Ok(Ok(reply)) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                let host = proxy.host();
                let result = ProxyTestResult::working(
                    proxy.clone(),
                    elapsed,
                    classify::anonymity(host, &reply.origin),
                    classify::proxy_type(host),
                );
                debug!("{} working in {:.0} ms", proxy, elapsed);
                self.locate(result)
            }
            Ok(Err(e)) => {
                debug!("{} failed: {}", proxy, e);
                ProxyTestResult::failed(proxy.clone(), e.to_string())
            }
            Err(_) => ProxyTestResult::failed(proxy.clone(), ProbeError::Timeout.to_string()),
        }
    }

    /// Probe all candidates with at most `max_concurrent` in flight.
    ///
    /// Results arrive in completion order. A probe that panics is logged and
    /// left out of the returned list without affecting the others.
    pub async fn test_batch(&self, candidates: Vec<ProxyCandidate>) -> Vec<ProxyTestResult> {
        let total = candidates.len();
        let width = self.config.max_concurrent.max(1);
        info!("Testing {} proxies (max concurrent: {})", total, width);

        let semaphore = Arc::new(Semaphore::new(width));
        let mut outcomes = stream::iter(candidates)
            .map(|proxy| {
                let sem = Arc::clone(&semaphore);
                let tester = self.clone();
                let probed = proxy.clone();
                let handle = tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.ok()?;
                    Some(tester.test_one(&probed).await)
                });
                async move { (proxy, handle.await) }
            })
            .buffer_unordered(width);

        let mut results = Vec::with_capacity(total);
        let mut completed = 0;
        while let Some((proxy, outcome)) = outcomes.next().await {
            completed += 1;
            match outcome {
                Ok(Some(result)) => results.push(result),
                Ok(None) => warn!("Concurrency gate closed before testing {}", proxy),
                Err(e) => error!("Error testing proxy {}: {}", proxy, e),
            }
            if completed % PROGRESS_EVERY == 0 {
                info!("Tested {}/{} proxies", completed, total);
            }
        }

        results
    }

    fn locate(&self, result: ProxyTestResult) -> ProxyTestResult {
        let Some(geo) = &self.geo_locator else {
            return result;
        };
        match geo.locate(result.proxy.host()) {
            Ok(location) => result.with_location(location.country, location.city),
            Err(e) => {
                debug!("No location for {}: {}", result.proxy, e);
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{AnonymityLevel, ProxyType};
    use crate::proxy::transport::ProbeReply;
    use crate::proxy::ProxyParser;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(s: &str) -> ProxyCandidate {
        ProxyParser::parse_line(s).unwrap()
    }

    /// Replies after a fixed delay; behavior picked by the proxy host
    struct ScriptedClient {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProbeClient for ScriptedClient {
        async fn probe(
            &self,
            proxy: &ProxyCandidate,
            _test_url: &str,
            _timeout: Duration,
        ) -> std::result::Result<ProbeReply, ProbeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match proxy.host() {
                "panic.example" => panic!("probe blew up"),
                "8.8.8.8" => Err(ProbeError::Status(503)),
                "9.9.9.9" => Err(ProbeError::MalformedBody),
                "7.7.7.7" => std::future::pending().await,
                host if host.starts_with("192.") => Ok(ProbeReply {
                    origin: "203.0.113.7".to_string(),
                }),
                host => Ok(ProbeReply {
                    origin: host.to_string(),
                }),
            }
        }
    }

    fn tester(client: Arc<ScriptedClient>, max_concurrent: usize) -> ProxyTester {
        let config = TesterConfig::new()
            .with_max_concurrent(max_concurrent)
            .with_timeout(Duration::from_secs(1));
        ProxyTester::with_client(config, client)
    }

    #[test]
    fn test_tester_config_default() {
        let config = TesterConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.test_url, DEFAULT_TEST_URL);
        assert_eq!(config.user_agent, PROBE_USER_AGENT);
        assert!(config.mmdb_path.is_none());
    }

    #[test]
    fn test_tester_config_builder() {
        let config = TesterConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_max_concurrent(0)
            .with_test_url("http://example.com/ip".to_string());

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.test_url, "http://example.com/ip");
    }

    #[test]
    fn test_with_config_uses_reqwest_prober() {
        let config = TesterConfig::new().with_user_agent("curl/8.0".to_string());
        let tester = ProxyTester::with_config(config);
        assert_eq!(tester.config.user_agent, "curl/8.0");
        assert!(tester.geo_locator.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_working_visible_proxy() {
        let client = Arc::new(ScriptedClient::new(Duration::from_millis(100)));
        let result = tester(client, 5).test_one(&candidate("1.1.1.1:80")).await;

        assert!(result.is_working);
        assert!(result.error_message.is_empty());
        assert!((result.response_time_ms - 100.0).abs() < 1.0);
        assert_eq!(result.anonymity, AnonymityLevel::Anonymous);
        assert_eq!(result.proxy_type, ProxyType::Http);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_working_opaque_proxy() {
        let client = Arc::new(ScriptedClient::new(Duration::from_millis(10)));
        let result = tester(client, 5).test_one(&candidate("192.0.2.1:3128")).await;

        assert!(result.is_working);
        assert_eq!(result.anonymity, AnonymityLevel::Elite);
        assert_eq!(result.proxy_type, ProxyType::Datacenter);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failures_carry_messages() {
        let client = Arc::new(ScriptedClient::new(Duration::from_millis(10)));
        let tester = tester(client, 5);

        let status = tester.test_one(&candidate("8.8.8.8:80")).await;
        assert!(!status.is_working);
        assert_eq!(status.error_message, "HTTP 503");
        assert_eq!(status.response_time_ms, 0.0);

        let body = tester.test_one(&candidate("9.9.9.9:80")).await;
        assert_eq!(body.error_message, "Invalid response body");

        let timeout = tester.test_one(&candidate("7.7.7.7:80")).await;
        assert!(!timeout.is_working);
        assert_eq!(timeout.error_message, "Timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_respects_concurrency_bound() {
        let client = Arc::new(ScriptedClient::new(Duration::from_millis(50)));
        let candidates: Vec<_> = (1..=40)
            .map(|i| candidate(&format!("10.0.0.{}:8080", i)))
            .collect();

        let results = tester(Arc::clone(&client), 4).test_batch(candidates).await;

        assert_eq!(results.len(), 40);
        let peak = client.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight was {}", peak);
        assert!(peak >= 1);
        assert_eq!(client.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_drops_panicking_probe() {
        let client = Arc::new(ScriptedClient::new(Duration::from_millis(5)));
        let candidates = vec![
            candidate("1.1.1.1:80"),
            candidate("panic.example:80"),
            candidate("8.8.8.8:80"),
        ];

        let results = tester(client, 2).test_batch(candidates).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.proxy.host() != "panic.example"));
        for result in &results {
            assert_eq!(result.is_working, result.error_message.is_empty());
        }
    }

    #[tokio::test]
    async fn test_batch_empty() {
        let client = Arc::new(ScriptedClient::new(Duration::ZERO));
        let results = tester(client, 3).test_batch(Vec::new()).await;
        assert!(results.is_empty());
    }
}
