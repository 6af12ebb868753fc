//! Full run: fetch, test, summarize, persist

use crate::proxy::fetcher::{FetchOutcome, ProxySourceFetcher, SourceReport};
use crate::proxy::metrics::TestMetrics;
use crate::proxy::models::{ProxyCandidate, ProxyTestResult};
use crate::proxy::report;
use crate::proxy::ProxyTester;
use crate::Config;
use log::{error, info, warn};

/// What a run produced
#[derive(Debug)]
pub enum RunOutcome {
    /// No source yielded a candidate, nothing was tested
    NoCandidates { reports: Vec<SourceReport> },
    Completed(CompletedRun),
}

#[derive(Debug)]
pub struct CompletedRun {
    pub results: Vec<ProxyTestResult>,
    pub metrics: TestMetrics,
    /// Number of lines written to the working proxies file
    pub working_saved: usize,
    /// Persistence failures; the console summary is printed regardless
    pub persist_errors: Vec<String>,
}

/// Fetch candidates from every source, then test and report on them
pub async fn run(fetcher: &ProxySourceFetcher, tester: &ProxyTester, config: &Config) -> RunOutcome {
    let outcome = fetcher.fetch_all().await;
    for report in outcome.ranked_reports() {
        info!("  {}: {} proxies", report.source, report.count);
    }

    match outcome {
        FetchOutcome::Empty { reports } => {
            warn!("No proxies found from any source");
            RunOutcome::NoCandidates { reports }
        }
        FetchOutcome::Found { candidates, .. } => {
            let candidates = candidates.into_iter().collect();
            RunOutcome::Completed(test_and_report(tester, candidates, config).await)
        }
    }
}

/// Test a candidate list, print the summary and write both output files
pub async fn test_and_report(
    tester: &ProxyTester,
    candidates: Vec<ProxyCandidate>,
    config: &Config,
) -> CompletedRun {
    info!("Starting proxy validation...");
    let results = tester.test_batch(candidates).await;
    let metrics = TestMetrics::compute(&results);

    report::print_summary(&results, &metrics);

    let mut persist_errors = Vec::new();
    match report::save_json(&config.results_path, &results, &metrics) {
        Ok(()) => info!("Results saved to {}", config.results_path.display()),
        Err(e) => {
            error!("Could not save results: {:#}", e);
            persist_errors.push(format!("{:#}", e));
        }
    }

    let working_saved = match report::save_working(&config.working_path, &results) {
        Ok(0) => {
            warn!(
                "No working proxies, cleared {}",
                config.working_path.display()
            );
            0
        }
        Ok(count) => {
            info!(
                "Working proxies saved to {} ({} proxies)",
                config.working_path.display(),
                count
            );
            count
        }
        Err(e) => {
            error!("Could not save working proxies: {:#}", e);
            persist_errors.push(format!("{:#}", e));
            0
        }
    };

    CompletedRun {
        results,
        metrics,
        working_saved,
        persist_errors,
    }
}
