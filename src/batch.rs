//! Concurrent ICMP + HTTP checking of a whole endpoint list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, warn};
use serde::Serialize;

use crate::checker::{ConnectivityResult, check_endpoint};
use crate::endpoints::Endpoint;
use crate::error::Result;
use crate::http::HttpPool;
use crate::logging::{Tone, highlight};
use crate::ping::EchoProbe;
use crate::status::percentage;
use crate::success;

pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 20;

const SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub ping_timeout: Duration,
    pub http_timeout: Duration,
    /// Reported back in the batch report.
    pub http_check: bool,
    /// Maximum simultaneous HTTP requests for the batch.
    pub concurrency: usize,
    pub use_system_proxy: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            ping_timeout: DEFAULT_PING_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            http_check: true,
            concurrency: DEFAULT_CONCURRENCY,
            use_system_proxy: false,
        }
    }
}

/// Aggregate outcome of one batch. `results[i]` belongs to `endpoints[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total_urls_tested: usize,
    /// Working URLs in input order, not deduplicated.
    pub working_urls: Vec<String>,
    pub working_count: usize,
    /// Percentage of working URLs; 0 for an empty batch.
    pub success_rate: f64,
    /// Distinct hostnames that answered ICMP.
    pub total_hosts: usize,
    pub results: Vec<ConnectivityResult>,
    pub http_check_enabled: bool,
}

impl BatchReport {
    pub fn from_results(results: Vec<ConnectivityResult>, http_check_enabled: bool) -> Self {
        let working_urls: Vec<String> = results
            .iter()
            .filter(|r| r.is_working)
            .map(|r| r.url.clone())
            .collect();

        let total_hosts = results
            .iter()
            .filter(|r| r.ping.is_alive)
            .map(|r| r.hostname.as_str())
            .collect::<HashSet<_>>()
            .len();

        let total_urls_tested = results.len();
        let working_count = working_urls.len();

        Self {
            total_urls_tested,
            working_urls,
            working_count,
            success_rate: percentage(working_count, total_urls_tested),
            total_hosts,
            results,
            http_check_enabled,
        }
    }
}

fn log_summary(report: &BatchReport) {
    if report.http_check_enabled {
        debug!("HTTP validation was enabled");
    } else {
        debug!("HTTP validation was disabled");
    }

    if report.working_urls.is_empty() {
        warn!("No working URLs found");
        return;
    }

    success!(
        "Connectivity test successful: {} working URLs found",
        report.working_count
    );
    debug!("Sample working URLs:");
    for url in report.working_urls.iter().take(SAMPLE_SIZE) {
        debug!("  ✓ {}", highlight(url, Tone::Success));
    }
    if report.working_urls.len() > SAMPLE_SIZE {
        debug!("  ... and {} more", report.working_urls.len() - SAMPLE_SIZE);
    }
}

/// Check every endpoint concurrently and aggregate the results.
///
/// One HTTP pool is shared by all checks and dropped once every task has
/// finished. A task that panics still yields a (failed) result in its slot,
/// so the report always has one result per endpoint.
///
/// # Errors
/// Returns `Error::ClientBuild` if the shared HTTP client cannot be created;
/// nothing is probed in that case.
pub async fn check_batch(
    endpoints: &[Endpoint],
    options: &BatchOptions,
    prober: Arc<dyn EchoProbe>,
) -> Result<BatchReport> {
    debug!(
        "Testing {} URLs concurrently with ping + HTTP validation (concurrency={})",
        endpoints.len(),
        options.concurrency
    );

    let pool = HttpPool::new(options.concurrency, options.http_timeout, options.use_system_proxy)?;

    let handles: Vec<_> = endpoints
        .iter()
        .cloned()
        .map(|endpoint| {
            let pool = pool.clone();
            let prober = Arc::clone(&prober);
            let (ping_timeout, http_timeout) = (options.ping_timeout, options.http_timeout);
            tokio::spawn(async move {
                check_endpoint(&endpoint, ping_timeout, http_timeout, prober.as_ref(), &pool).await
            })
        })
        .collect();

    debug!("Running {} connectivity checks concurrently", handles.len());
    let joined = join_all(handles).await;
    drop(pool);

    let results = endpoints
        .iter()
        .zip(joined)
        .map(|(endpoint, outcome)| match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to check {}: {e}", endpoint.url());
                ConnectivityResult::task_failed(endpoint, e)
            }
        })
        .collect();

    let report = BatchReport::from_results(results, options.http_check);
    log_summary(&report);
    Ok(report)
}
