//! HTTP validation of endpoints that already answered ICMP.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use reqwest::{Client, Url, redirect};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::logging::{Tone, highlight};

/// Connection limit for a pool created for a single standalone check.
pub const STANDALONE_POOL_LIMIT: usize = 10;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpFailure {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Normalized result of one GET against a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpOutcome {
    pub url: String,
    pub http_status: Option<u16>,
    /// Final URL after redirects, only when it differs from `url`.
    pub redirects_to: Option<String>,
    pub is_http_working: bool,
    pub error: Option<String>,
}

impl HttpOutcome {
    pub fn response(url: impl Into<String>, status: u16, redirects_to: Option<String>) -> Self {
        Self {
            url: url.into(),
            http_status: Some(status),
            redirects_to,
            is_http_working: status < 400,
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, failure: HttpFailure) -> Self {
        Self {
            url: url.into(),
            http_status: None,
            redirects_to: None,
            is_http_working: false,
            error: Some(failure.to_string()),
        }
    }
}

/// A `reqwest::Client` plus a cap on how many requests it may have in flight.
///
/// reqwest only limits idle connections, so the semaphore is what actually
/// bounds outbound HTTP. Clones share both the client and the permits.
#[derive(Debug, Clone)]
pub struct HttpPool {
    client: Client,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl HttpPool {
    /// Build a pool allowing `concurrency` simultaneous requests (minimum 1).
    ///
    /// Proxy settings from the environment are ignored unless
    /// `use_system_proxy` is set, so probes measure the direct path.
    pub fn new(concurrency: usize, timeout: Duration, use_system_proxy: bool) -> Result<Self> {
        let limit = concurrency.max(1);

        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(limit)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS));
        if !use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by an in-flight request.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Render an error with its source chain; reqwest's top-level message alone
/// rarely says what went wrong.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn classify(err: &reqwest::Error) -> HttpFailure {
    if err.is_timeout() {
        HttpFailure::Timeout
    } else if err.is_connect() || err.is_request() || err.is_redirect() || err.is_body() {
        HttpFailure::Connection(describe(err))
    } else {
        HttpFailure::Unexpected(describe(err))
    }
}

/// Whether the final URL is a different resource from the requested one.
/// Compares parsed URLs so that `http://a.example` and `http://a.example/`
/// count as the same.
fn redirect_target(requested: &str, final_url: &Url) -> Option<String> {
    let same = match Url::parse(requested) {
        Ok(parsed) => &parsed == final_url,
        Err(_) => requested == final_url.as_str(),
    };
    (!same).then(|| final_url.to_string())
}

/// GET `url` through the shared pool, following redirects. Never fails;
/// every error becomes an `HttpOutcome` with `error` set.
pub async fn probe_http(pool: &HttpPool, url: &str, timeout: Duration) -> HttpOutcome {
    debug!(
        "HTTP request: {} (timeout={:.1}s)",
        highlight(url, Tone::Debug),
        timeout.as_secs_f64()
    );

    let _permit = match pool.permits.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("Unexpected HTTP error for {}: {e}", highlight(url, Tone::Error));
            return HttpOutcome::failure(url, HttpFailure::Unexpected(e.to_string()));
        }
    };

    match tokio::time::timeout(timeout, pool.client.get(url).send()).await {
        Ok(Ok(response)) => {
            let status = response.status().as_u16();
            let redirects_to = redirect_target(url, response.url());

            debug!("HTTP response: {} -> {status}", highlight(url, Tone::Debug));
            if let Some(target) = &redirects_to {
                debug!(
                    "Redirected: {} → {}",
                    highlight(url, Tone::Debug),
                    highlight(target, Tone::Debug)
                );
            }

            HttpOutcome::response(url, status, redirects_to)
        }
        Ok(Err(e)) => {
            let failure = classify(&e);
            match &failure {
                HttpFailure::Timeout => warn!("HTTP timeout for {}", highlight(url, Tone::Warning)),
                HttpFailure::Connection(msg) => warn!(
                    "HTTP connection error for {}: {msg}",
                    highlight(url, Tone::Warning)
                ),
                HttpFailure::Unexpected(msg) => {
                    error!("Unexpected HTTP error for {}: {msg}", highlight(url, Tone::Error))
                }
            }
            HttpOutcome::failure(url, failure)
        }
        Err(_) => {
            warn!("HTTP timeout for {}", highlight(url, Tone::Warning));
            HttpOutcome::failure(url, HttpFailure::Timeout)
        }
    }
}
