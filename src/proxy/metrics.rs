//! Summary statistics over a completed test run

use crate::proxy::models::{ProxyTestResult, UNKNOWN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of countries kept in [`TestMetrics::top_countries`]
pub const TOP_COUNTRIES: usize = 5;

/// Aggregated metrics for a test run, always recomputed from the full list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    pub total_tested: usize,
    pub working_count: usize,
    pub average_response_time: f64,
    pub median_response_time: f64,
    pub success_rate: f64,
    pub anonymity_distribution: BTreeMap<String, usize>,
    pub type_distribution: BTreeMap<String, usize>,
    pub top_countries: Vec<(String, usize)>,
}

impl TestMetrics {
    pub fn compute(results: &[ProxyTestResult]) -> Self {
        let working: Vec<&ProxyTestResult> = results.iter().filter(|r| r.is_working).collect();
        let total_tested = results.len();
        let working_count = working.len();

        let mut times: Vec<f64> = working.iter().map(|r| r.response_time_ms).collect();
        let average_response_time = mean(&times);
        let median_response_time = median(&mut times);

        let success_rate = if total_tested > 0 {
            100.0 * working_count as f64 / total_tested as f64
        } else {
            0.0
        };

        let mut anonymity_distribution = BTreeMap::new();
        let mut type_distribution = BTreeMap::new();
        for result in &working {
            *anonymity_distribution
                .entry(result.anonymity.to_string())
                .or_insert(0) += 1;
            *type_distribution
                .entry(result.proxy_type.to_string())
                .or_insert(0) += 1;
        }

        let countries = working
            .iter()
            .map(|r| r.country.as_str())
            .filter(|country| *country != UNKNOWN);

        Self {
            total_tested,
            working_count,
            average_response_time,
            median_response_time,
            success_rate,
            anonymity_distribution,
            type_distribution,
            top_countries: top_counts(countries, TOP_COUNTRIES),
        }
    }

    /// Share of working proxies, as a percentage, that `count` represents
    pub fn share_of_working(&self, count: usize) -> f64 {
        if self.working_count == 0 {
            0.0
        } else {
            count as f64 / self.working_count as f64 * 100.0
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Count occurrences, largest first, ties kept in first-seen order
pub(crate) fn top_counts<'a, I>(items: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(key, _)| key == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item.to_string(), 1)),
        }
    }
    // sort_by is stable, so equal counts keep insertion order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{AnonymityLevel, ProxyCandidate, ProxyType};
    use crate::proxy::ProxyParser;

    fn candidate(s: &str) -> ProxyCandidate {
        ProxyParser::parse_line(s).unwrap()
    }

    fn working(proxy: &str, ms: f64, country: &str) -> ProxyTestResult {
        ProxyTestResult::working(candidate(proxy), ms, AnonymityLevel::Elite, ProxyType::Http)
            .with_location(Some(country.to_string()), None)
    }

    fn failed(proxy: &str) -> ProxyTestResult {
        ProxyTestResult::failed(candidate(proxy), "Timeout")
    }

    #[test]
    fn test_empty_results() {
        let metrics = TestMetrics::compute(&[]);
        assert_eq!(metrics.total_tested, 0);
        assert_eq!(metrics.working_count, 0);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.average_response_time, 0.0);
        assert_eq!(metrics.median_response_time, 0.0);
        assert!(metrics.top_countries.is_empty());
    }

    #[test]
    fn test_all_failed() {
        let metrics = TestMetrics::compute(&[failed("1.1.1.1:80"), failed("2.2.2.2:80")]);
        assert_eq!(metrics.total_tested, 2);
        assert_eq!(metrics.working_count, 0);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.average_response_time, 0.0);
        assert_eq!(metrics.median_response_time, 0.0);
        assert!(metrics.anonymity_distribution.is_empty());
        assert!(metrics.type_distribution.is_empty());
    }

    #[test]
    fn test_rates_and_latency() {
        let results = vec![
            working("1.1.1.1:80", 100.0, "US"),
            working("2.2.2.2:80", 300.0, "DE"),
            working("3.3.3.3:80", 200.0, "US"),
            working("4.4.4.4:80", 400.0, UNKNOWN),
            failed("5.5.5.5:80"),
        ];
        let metrics = TestMetrics::compute(&results);

        assert_eq!(metrics.total_tested, 5);
        assert_eq!(metrics.working_count, 4);
        assert_eq!(metrics.success_rate, 100.0 * 4.0 / 5.0);
        assert_eq!(metrics.average_response_time, 250.0);
        assert_eq!(metrics.median_response_time, 250.0);
        assert_eq!(metrics.share_of_working(2), 50.0);
    }

    #[test]
    fn test_median_odd_count() {
        let results = vec![
            working("1.1.1.1:80", 900.0, "US"),
            working("2.2.2.2:80", 100.0, "US"),
            working("3.3.3.3:80", 200.0, "US"),
        ];
        assert_eq!(TestMetrics::compute(&results).median_response_time, 200.0);
    }

    #[test]
    fn test_distributions_sum_to_working_count() {
        let results = vec![
            ProxyTestResult::working(
                candidate("104.1.1.1:80"),
                10.0,
                AnonymityLevel::Anonymous,
                ProxyType::Datacenter,
            ),
            ProxyTestResult::working(
                candidate("5.1.1.1:80"),
                20.0,
                AnonymityLevel::Elite,
                ProxyType::Residential,
            ),
            ProxyTestResult::working(
                candidate("8.1.1.1:80"),
                30.0,
                AnonymityLevel::Elite,
                ProxyType::Http,
            ),
            failed("9.9.9.9:80"),
        ];
        let metrics = TestMetrics::compute(&results);

        assert_eq!(metrics.anonymity_distribution.values().sum::<usize>(), 3);
        assert_eq!(metrics.type_distribution.values().sum::<usize>(), 3);
        assert_eq!(metrics.anonymity_distribution["elite"], 2);
        assert_eq!(metrics.anonymity_distribution["anonymous"], 1);
        assert_eq!(metrics.type_distribution["datacenter"], 1);
        assert!(!metrics.type_distribution.contains_key("unknown"));
    }

    #[test]
    fn test_top_countries_ranking() {
        let countries = ["FR", "US", "DE", "US", "JP", "BR", "IN", "DE", "US", UNKNOWN];
        let results: Vec<_> = countries
            .iter()
            .enumerate()
            .map(|(i, c)| working(&format!("10.0.0.{}:80", i + 1), 50.0, c))
            .collect();
        let metrics = TestMetrics::compute(&results);

        assert_eq!(metrics.top_countries.len(), 5);
        assert_eq!(metrics.top_countries[0], ("US".to_string(), 3));
        assert_eq!(metrics.top_countries[1], ("DE".to_string(), 2));
        // ties in first-seen order
        assert_eq!(metrics.top_countries[2], ("FR".to_string(), 1));
        assert_eq!(metrics.top_countries[3], ("JP".to_string(), 1));
        assert_eq!(metrics.top_countries[4], ("BR".to_string(), 1));
        assert!(metrics
            .top_countries
            .windows(2)
            .all(|pair| pair[0].1 >= pair[1].1));
    }

    #[test]
    fn test_metrics_serialize() {
        let metrics = TestMetrics::compute(&[working("1.1.1.1:80", 10.0, "US")]);
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value["working_count"], 1);
        assert_eq!(value["top_countries"][0][0], "US");
        assert_eq!(value["anonymity_distribution"]["elite"], 1);
    }
}
