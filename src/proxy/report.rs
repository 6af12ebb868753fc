//! Console summary and persisted outputs of a test run

use crate::proxy::metrics::{top_counts, TestMetrics};
use crate::proxy::models::ProxyTestResult;
use crate::proxy::parser::ProxyParser;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Default JSON results file
pub const DEFAULT_RESULTS_FILE: &str = "proxy_test_results.json";

/// Default working proxies file
pub const DEFAULT_WORKING_FILE: &str = "working_proxies.txt";

const FASTEST_SHOWN: usize = 10;
const FAILURES_SHOWN: usize = 5;

/// Machine-readable record of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub tested_at: DateTime<Utc>,
    pub results: Vec<ProxyTestResult>,
    pub metrics: TestMetrics,
}

impl TestReport {
    pub fn new(results: Vec<ProxyTestResult>, metrics: TestMetrics) -> Self {
        Self {
            tested_at: Utc::now(),
            results,
            metrics,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not a results file", path.display()))
    }
}

/// Working proxies, fastest first
pub fn fastest(results: &[ProxyTestResult], limit: usize) -> Vec<&ProxyTestResult> {
    let mut working: Vec<_> = results.iter().filter(|r| r.is_working).collect();
    working.sort_by(|a, b| a.response_time_ms.total_cmp(&b.response_time_ms));
    working.truncate(limit);
    working
}

/// Most common failure messages with their counts
pub fn failure_reasons(results: &[ProxyTestResult], limit: usize) -> Vec<(String, usize)> {
    let reasons = results.iter().filter(|r| !r.is_working).map(|r| {
        if r.error_message.is_empty() {
            "Unknown error"
        } else {
            r.error_message.as_str()
        }
    });
    top_counts(reasons, limit)
}

/// Render the human-readable summary
pub fn render_summary(results: &[ProxyTestResult], metrics: &TestMetrics) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_summary(&mut out, results, metrics);
    out
}

fn write_summary(
    out: &mut String,
    results: &[ProxyTestResult],
    metrics: &TestMetrics,
) -> std::fmt::Result {
    writeln!(out, "\n{}", "=".repeat(60))?;
    writeln!(out, "PROXY TEST RESULTS SUMMARY")?;
    writeln!(out, "{}", "=".repeat(60))?;

    writeln!(out, "\nOverall Metrics:")?;
    writeln!(out, "  Total Tested: {}", metrics.total_tested)?;
    writeln!(out, "  Working: {}", metrics.working_count)?;
    writeln!(out, "  Success Rate: {:.1}%", metrics.success_rate)?;
    writeln!(out, "  Avg Response Time: {:.0} ms", metrics.average_response_time)?;
    writeln!(out, "  Median Response Time: {:.0} ms", metrics.median_response_time)?;

    if !metrics.anonymity_distribution.is_empty() {
        writeln!(out, "\nAnonymity Distribution:")?;
        for (anonymity, count) in &metrics.anonymity_distribution {
            writeln!(
                out,
                "  {}: {} ({:.1}%)",
                anonymity,
                count,
                metrics.share_of_working(*count)
            )?;
        }
    }

    if !metrics.type_distribution.is_empty() {
        writeln!(out, "\nProxy Type Distribution:")?;
        for (proxy_type, count) in &metrics.type_distribution {
            writeln!(
                out,
                "  {}: {} ({:.1}%)",
                proxy_type,
                count,
                metrics.share_of_working(*count)
            )?;
        }
    }

    if !metrics.top_countries.is_empty() {
        writeln!(out, "\nTop Countries:")?;
        for (country, count) in &metrics.top_countries {
            writeln!(
                out,
                "  {}: {} ({:.1}%)",
                country,
                count,
                metrics.share_of_working(*count)
            )?;
        }
    }

    let fastest = fastest(results, FASTEST_SHOWN);
    if !fastest.is_empty() {
        writeln!(out, "\nTop {} Fastest Proxies:", FASTEST_SHOWN)?;
        for (i, result) in fastest.iter().enumerate() {
            writeln!(
                out,
                "  {:2}. {:20} {:5.0} ms - {} - {}",
                i + 1,
                result.proxy.as_str(),
                result.response_time_ms,
                result.anonymity,
                result.proxy_type
            )?;
        }
    }

    let failed = results.iter().filter(|r| !r.is_working).count();
    if failed > 0 {
        writeln!(out, "\nCommon Failure Reasons:")?;
        for (reason, count) in failure_reasons(results, FAILURES_SHOWN) {
            let percentage = count as f64 / failed as f64 * 100.0;
            writeln!(out, "  {}: {} ({:.1}%)", reason, count, percentage)?;
        }
    }

    writeln!(out, "\nRecommendations:")?;
    for line in recommendations(metrics.success_rate) {
        writeln!(out, "  {}", line)?;
    }
    Ok(())
}

/// Advice keyed on the success rate
pub fn recommendations(success_rate: f64) -> &'static [&'static str] {
    if success_rate < 10.0 {
        &[
            "Low success rate. Consider:",
            "  - Using paid proxy services for better reliability",
            "  - Testing at different times (proxy lists update frequently)",
            "  - Adding more proxy sources",
        ]
    } else if success_rate < 30.0 {
        &[
            "Moderate success rate. For better performance:",
            "  - Use the fastest proxies from the top 10 list",
            "  - Rotate proxies to avoid overuse",
            "  - Consider adding residential proxy sources",
        ]
    } else {
        &[
            "Good success rate. You can:",
            "  - Use these proxies for light automation tasks",
            "  - Rotate proxies and handle failures",
            "  - Monitor proxy performance over time",
        ]
    }
}

/// Print the summary to stdout
pub fn print_summary(results: &[ProxyTestResult], metrics: &TestMetrics) {
    print!("{}", render_summary(results, metrics));
}

/// Persist results and metrics as pretty JSON
pub fn save_json<P: AsRef<Path>>(
    path: P,
    results: &[ProxyTestResult],
    metrics: &TestMetrics,
) -> Result<()> {
    let path = path.as_ref();
    let report = TestReport::new(results.to_vec(), metrics.clone());
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Write working proxies one per line and return how many were written.
///
/// With no working proxies the file is truncated, so a list left by an
/// earlier run never survives as if it were current.
pub fn save_working<P: AsRef<Path>>(path: P, results: &[ProxyTestResult]) -> Result<usize> {
    let working: Vec<_> = results
        .iter()
        .filter(|r| r.is_working)
        .map(|r| &r.proxy)
        .collect();
    ProxyParser::save_to_file(working.iter().copied(), path)?;
    Ok(working.len())
}
