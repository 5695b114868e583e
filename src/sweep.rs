//! Sequential ICMP-only checks for quick triage.
//!
//! Slower than [`check_batch`](crate::batch::check_batch) and without HTTP
//! validation; one host at a time.

use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::endpoints::{Endpoint, hostnames};
use crate::logging::{Tone, highlight};
use crate::ping::{EchoProbe, PingOutcome};
use crate::status::percentage;
use crate::success;

const SAMPLE_SIZE: usize = 5;

/// Ping each hostname in turn. Results are in input order.
pub async fn sweep_hosts(
    prober: &dyn EchoProbe,
    hostnames: &[String],
    timeout: Duration,
) -> Vec<PingOutcome> {
    debug!(
        "Starting ping sweep: {} hosts, timeout={:.1}s",
        hostnames.len(),
        timeout.as_secs_f64()
    );

    let mut results = Vec::with_capacity(hostnames.len());
    for hostname in hostnames {
        debug!("Pinging {}", highlight(hostname, Tone::Debug));
        let outcome = prober.probe(hostname, timeout).await;
        if outcome.is_alive {
            info!("Host reachable: {}", highlight(hostname, Tone::Success));
        } else {
            error!("Host unreachable: {}", highlight(hostname, Tone::Error));
        }
        results.push(outcome);
    }

    debug!("Ping sweep complete: {} hosts processed", results.len());
    results
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickCheckReport {
    pub total: usize,
    pub alive: usize,
    pub success_rate: f64,
    pub results: Vec<PingOutcome>,
}

/// Sweep the hosts of `endpoints` and summarize how many answered.
pub async fn quick_check(
    prober: &dyn EchoProbe,
    endpoints: &[Endpoint],
    timeout: Duration,
) -> QuickCheckReport {
    debug!("Starting quick connectivity check: {} URLs", endpoints.len());

    let results = sweep_hosts(prober, &hostnames(endpoints), timeout).await;
    let alive = results.iter().filter(|r| r.is_alive).count();
    let success_rate = percentage(alive, results.len());

    info!(
        "Quick check complete: {alive}/{} hosts alive ({success_rate:.1}% success rate)",
        results.len()
    );
    if alive > 0 {
        success!("Found {alive} reachable hosts");
    } else {
        warn!("No hosts reachable in quick check");
    }

    QuickCheckReport {
        total: results.len(),
        alive,
        success_rate,
        results,
    }
}

/// URLs whose host answers ICMP, in input order. No HTTP request is made.
pub async fn find_working_urls(
    prober: &dyn EchoProbe,
    endpoints: &[Endpoint],
    timeout: Duration,
) -> Vec<String> {
    debug!("Finding working URLs: checking {} URLs", endpoints.len());

    let results = sweep_hosts(prober, &hostnames(endpoints), timeout).await;
    let working_urls: Vec<String> = endpoints
        .iter()
        .zip(&results)
        .filter(|(_, outcome)| outcome.is_alive)
        .map(|(endpoint, _)| endpoint.url().to_string())
        .collect();

    info!(
        "Found {} working URLs out of {} total",
        working_urls.len(),
        endpoints.len()
    );
    if working_urls.is_empty() {
        warn!("No working URLs found");
        return working_urls;
    }

    success!("Working URLs identified: {}", working_urls.len());
    for url in working_urls.iter().take(SAMPLE_SIZE) {
        debug!("Working: {}", highlight(url, Tone::Success));
    }
    if working_urls.len() > SAMPLE_SIZE {
        debug!("... and {} more", working_urls.len() - SAMPLE_SIZE);
    }
    working_urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ping::PingFailure;
    use std::sync::Mutex;

    /// Answers for hosts listed in `alive`, records call order.
    struct ListProbe {
        alive: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    impl ListProbe {
        fn new(alive: Vec<&'static str>) -> Self {
            Self {
                alive,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl EchoProbe for ListProbe {
        async fn probe(&self, hostname: &str, _timeout: Duration) -> PingOutcome {
            self.seen.lock().unwrap().push(hostname.to_string());
            if self.alive.iter().any(|h| *h == hostname) {
                PingOutcome::from_attempts(hostname, &[Some(Duration::from_millis(1)), None])
            } else {
                PingOutcome::failure(hostname, PingFailure::Icmp("Destination unreachable".into()))
            }
        }
    }

    fn endpoints(urls: &[&str]) -> Vec<Endpoint> {
        urls.iter().map(|u| Endpoint::parse(*u).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_sweep_preserves_order() {
        let probe = ListProbe::new(vec!["b.example"]);
        let hosts = vec!["a.example".to_string(), "b.example".to_string()];

        let results = sweep_hosts(&probe, &hosts, Duration::from_secs(1)).await;

        assert_eq!(*probe.seen.lock().unwrap(), hosts);
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_alive);
        assert_eq!(results[0].error.as_deref(), Some("Destination unreachable"));
        assert!(results[1].is_alive);
        assert_eq!(results[1].packet_loss, 50.0);
    }

    #[tokio::test]
    async fn test_quick_check_summary() {
        let probe = ListProbe::new(vec!["a.example"]);
        let report = quick_check(
            &probe,
            &endpoints(&["http://a.example/", "http://b.example/", "http://a.example/x"]),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(report.total, 3);
        assert_eq!(report.alive, 2);
        assert!((report.success_rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_quick_check_empty() {
        let probe = ListProbe::new(vec![]);
        let report = quick_check(&probe, &[], Duration::from_secs(1)).await;
        assert_eq!(report.total, 0);
        assert_eq!(report.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_find_working_urls() {
        let probe = ListProbe::new(vec!["a.example", "c.example"]);
        let working = find_working_urls(
            &probe,
            &endpoints(&["http://a.example/", "http://b.example/", "http://c.example/files"]),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(working, vec!["http://a.example/", "http://c.example/files"]);
    }
}
