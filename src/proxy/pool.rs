//! Caller-owned rotation pool over validated proxies

use crate::proxy::models::{ProxyCandidate, ProxyTestResult};
use chrono::{DateTime, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Success rate assumed for a proxy with no recorded requests
pub const DEFAULT_SUCCESS_RATE: f64 = 0.5;

/// How the next proxy is chosen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationStrategy {
    /// Round-robin in pool order
    Sequential,
    /// Uniformly random
    Random,
    /// Random, weighted by observed success rate
    SuccessWeighted { default_rate: f64 },
    /// Lowest average response time
    Fastest,
}

impl Default for RotationStrategy {
    fn default() -> Self {
        RotationStrategy::SuccessWeighted {
            default_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

impl FromStr for RotationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(RotationStrategy::Sequential),
            "random" => Ok(RotationStrategy::Random),
            "weighted" | "success" => Ok(RotationStrategy::default()),
            "fastest" => Ok(RotationStrategy::Fastest),
            _ => Err(anyhow::anyhow!(
                "Invalid strategy: {}. Use: sequential, random, weighted, fastest",
                s
            )),
        }
    }
}

/// Running usage statistics for one proxy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub total_response_time: f64,
    pub last_used: Option<DateTime<Utc>>,
}

impl ProxyStats {
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.successful_requests as f64 / self.total_requests as f64)
    }

    pub fn avg_response_time(&self) -> Option<f64> {
        (self.total_requests > 0).then(|| self.total_response_time / self.total_requests as f64)
    }
}

/// A set of proxies plus the stats used to rotate through them
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<ProxyCandidate>,
    stats: HashMap<ProxyCandidate, ProxyStats>,
    cursor: usize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<ProxyCandidate>) -> Self {
        Self {
            proxies,
            ..Default::default()
        }
    }

    /// Pool of the working proxies of a run, seeded with each probe's outcome
    pub fn from_results(results: &[ProxyTestResult]) -> Self {
        let mut pool = Self::default();
        for result in results.iter().filter(|r| r.is_working) {
            pool.record(&result.proxy, true, result.response_time_ms);
        }
        pool
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn proxies(&self) -> &[ProxyCandidate] {
        &self.proxies
    }

    pub fn stats(&self, proxy: &ProxyCandidate) -> Option<&ProxyStats> {
        self.stats.get(proxy)
    }

    /// Pick the next proxy using the thread-local RNG
    pub fn next(&mut self, strategy: &RotationStrategy) -> Option<ProxyCandidate> {
        self.next_with(strategy, &mut thread_rng())
    }

    /// Pick the next proxy; `None` when the pool is empty
    pub fn next_with<R: Rng + ?Sized>(
        &mut self,
        strategy: &RotationStrategy,
        rng: &mut R,
    ) -> Option<ProxyCandidate> {
        if self.proxies.is_empty() {
            return None;
        }

        match strategy {
            RotationStrategy::Sequential => {
                let proxy = self.proxies[self.cursor % self.proxies.len()].clone();
                self.cursor = (self.cursor + 1) % self.proxies.len();
                Some(proxy)
            }
            RotationStrategy::Random => self.proxies.choose(rng).cloned(),
            RotationStrategy::SuccessWeighted { default_rate } => {
                let weights: Vec<f64> = self
                    .proxies
                    .iter()
                    .map(|p| {
                        self.stats
                            .get(p)
                            .and_then(ProxyStats::success_rate)
                            .unwrap_or(*default_rate)
                            .max(0.0)
                    })
                    .collect();

                match WeightedIndex::new(&weights) {
                    Ok(index) => Some(self.proxies[index.sample(rng)].clone()),
                    // all weights zero
                    Err(_) => self.proxies.choose(rng).cloned(),
                }
            }
            RotationStrategy::Fastest => self
                .proxies
                .iter()
                .min_by(|a, b| {
                    let a = self.average_or_max(a);
                    let b = self.average_or_max(b);
                    a.total_cmp(&b)
                })
                .cloned(),
        }
    }

    /// Record the outcome of using a proxy. Unknown proxies are added.
    pub fn record(&mut self, proxy: &ProxyCandidate, success: bool, response_time_ms: f64) {
        if !self.proxies.contains(proxy) {
            self.proxies.push(proxy.clone());
        }
        let stats = self.stats.entry(proxy.clone()).or_default();
        stats.total_requests += 1;
        stats.total_response_time += response_time_ms;
        if success {
            stats.successful_requests += 1;
        }
        stats.last_used = Some(Utc::now());
    }

    fn average_or_max(&self, proxy: &ProxyCandidate) -> f64 {
        self.stats
            .get(proxy)
            .and_then(ProxyStats::avg_response_time)
            .unwrap_or(f64::MAX)
    }
}
