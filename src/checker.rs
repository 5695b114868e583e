use std::time::Duration;

use log::{debug, error, warn};
use serde::Serialize;

use crate::endpoints::Endpoint;
use crate::http::{HttpFailure, HttpOutcome, HttpPool, STANDALONE_POOL_LIMIT, probe_http};
use crate::logging::{Tone, highlight};
use crate::ping::{EchoProbe, PingOutcome};
use crate::success;

/// Combined ICMP + HTTP verdict for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityResult {
    pub url: String,
    pub hostname: String,
    pub ping: PingOutcome,
    /// `None` when the ping stage failed and HTTP was skipped.
    pub http: Option<HttpOutcome>,
    pub is_working: bool,
}

impl ConnectivityResult {
    pub fn new(endpoint: &Endpoint, ping: PingOutcome, http: Option<HttpOutcome>) -> Self {
        let is_working = ping.is_alive && http.as_ref().is_some_and(|h| h.is_http_working);
        Self {
            url: endpoint.url().to_string(),
            hostname: endpoint.hostname().to_string(),
            ping,
            http,
            is_working,
        }
    }

    /// Result recorded for an endpoint whose check task died.
    pub fn task_failed(endpoint: &Endpoint, reason: impl std::fmt::Display) -> Self {
        Self::new(endpoint, PingOutcome::task_failed(endpoint.hostname(), reason), None)
    }
}

fn log_verdict(result: &ConnectivityResult) {
    debug!("PING {}", highlight(&result.hostname, Tone::Debug));
    if let Some(http) = &result.http {
        match (&http.http_status, &http.redirects_to) {
            (Some(status), Some(target)) => {
                debug!("HTTP {}: {status} → {target}", highlight(&result.url, Tone::Debug))
            }
            (Some(status), None) => debug!("HTTP {}: {status}", highlight(&result.url, Tone::Debug)),
            _ => {}
        }
    }

    if result.is_working {
        success!("WORKING: {}", highlight(&result.url, Tone::Success));
    } else if !result.ping.is_alive {
        error!("NETWORK DOWN: {}", highlight(&result.url, Tone::Error));
    } else if result.http.is_some() {
        warn!("NETWORK OK, SERVICE DOWN: {}", highlight(&result.url, Tone::Warning));
    } else {
        error!("UNKNOWN: {}", highlight(&result.url, Tone::Error));
    }
}

/// Ping the endpoint's host, then GET its URL through `pool` if the host is
/// alive. An unreachable host never gets an HTTP request.
pub async fn check_endpoint(
    endpoint: &Endpoint,
    ping_timeout: Duration,
    http_timeout: Duration,
    prober: &dyn EchoProbe,
    pool: &HttpPool,
) -> ConnectivityResult {
    let ping = prober.probe(endpoint.hostname(), ping_timeout).await;

    let http = if ping.is_alive {
        Some(probe_http(pool, endpoint.url(), http_timeout).await)
    } else {
        None
    };

    let result = ConnectivityResult::new(endpoint, ping, http);
    log_verdict(&result);
    result
}

/// Same as [`check_endpoint`] for callers without a shared pool.
///
/// A private pool is built only if the ping succeeds and is dropped before
/// returning.
pub async fn check_endpoint_standalone(
    endpoint: &Endpoint,
    ping_timeout: Duration,
    http_timeout: Duration,
    prober: &dyn EchoProbe,
) -> ConnectivityResult {
    let ping = prober.probe(endpoint.hostname(), ping_timeout).await;

    let http = if ping.is_alive {
        let outcome = match HttpPool::new(STANDALONE_POOL_LIMIT, http_timeout, false) {
            Ok(pool) => probe_http(&pool, endpoint.url(), http_timeout).await,
            Err(e) => HttpOutcome::failure(endpoint.url(), HttpFailure::Unexpected(e.to_string())),
        };
        Some(outcome)
    } else {
        None
    };

    let result = ConnectivityResult::new(endpoint, ping, http);
    log_verdict(&result);
    result
}
