//! Shared helpers: a canned HTTP server on loopback and a scripted ICMP probe.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use reach_probe::{EchoProbe, PingFailure, PingOutcome};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// =============================================================================
// HTTP server
// =============================================================================

/// Request counters shared between the router and the test.
#[derive(Debug, Clone, Default)]
struct Counters {
    requests: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    delay: Duration,
}

/// Loopback HTTP server with fixed routes:
/// `/ok` 200, `/missing` 404, `/error` 500, `/moved` 302 -> `/ok`,
/// anything else 200.
pub struct TestServer {
    pub addr: SocketAddr,
    counters: Counters,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn request_count(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were being handled at the same time.
    pub fn max_active(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Counts the request as in flight until the response is produced, after
/// waiting the configured delay.
async fn track(State(counters): State<Counters>, request: Request, next: Next) -> Response {
    counters.requests.fetch_add(1, Ordering::SeqCst);
    let now = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
    counters.max_active.fetch_max(now, Ordering::SeqCst);

    tokio::time::sleep(counters.delay).await;
    let response = next.run(request).await;

    counters.active.fetch_sub(1, Ordering::SeqCst);
    response
}

fn create_router(counters: Counters) -> Router {
    Router::new()
        .route("/ok", get(|| async { StatusCode::OK }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/error", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/moved",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/ok")]) }),
        )
        .fallback(|| async { StatusCode::OK })
        .layer(middleware::from_fn_with_state(counters, track))
}

/// Start a server that waits `delay` before answering each request.
pub async fn spawn_server(delay: Duration) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let counters = Counters {
        delay,
        ..Counters::default()
    };
    let router = create_router(counters.clone());

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        addr,
        counters,
        handle,
    }
}

// =============================================================================
// Scripted ICMP probe
// =============================================================================

#[derive(Debug, Clone)]
pub enum Script {
    Alive,
    Dns,
    Panic,
    /// Not alive after sleeping, to shuffle completion order.
    SlowDown(Duration),
}

/// Echo probe whose answer per hostname is fixed up front. Unknown hosts
/// fail DNS resolution.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hostname: &str, script: Script) -> Self {
        self.scripts.insert(hostname.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EchoProbe for ScriptedProbe {
    async fn probe(&self, hostname: &str, _timeout: Duration) -> PingOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(hostname) {
            Some(Script::Alive) => PingOutcome::from_attempts(
                hostname,
                &[Some(Duration::from_millis(2)), Some(Duration::from_millis(4)), None],
            ),
            Some(Script::Panic) => panic!("probe exploded for {hostname}"),
            Some(Script::SlowDown(delay)) => {
                tokio::time::sleep(*delay).await;
                PingOutcome::failure(hostname, PingFailure::Icmp("Host unreachable".into()))
            }
            Some(Script::Dns) | None => PingOutcome::failure(hostname, PingFailure::Dns),
        }
    }
}
