//! Reachability probing for lists of service endpoints.
//!
//! Each endpoint is pinged over ICMP; hosts that answer get an HTTP GET to
//! confirm the service itself is up. [`check_batch`] runs all endpoints
//! concurrently behind one connection-limited HTTP pool, while
//! [`sweep`] offers a slower ICMP-only pass for quick triage.

pub mod logging;

pub mod batch;
pub mod checker;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod ping;
pub mod ping_executor;
pub mod status;
pub mod sweep;

pub use batch::{BatchOptions, BatchReport, check_batch};
pub use checker::{ConnectivityResult, check_endpoint, check_endpoint_standalone};
pub use config::AppConfig;
pub use endpoints::{Endpoint, load_endpoints};
pub use error::{Error, Result};
pub use http::{HttpOutcome, HttpPool, probe_http};
pub use ping::{EchoProbe, PingFailure, PingOutcome};
pub use ping_executor::IcmpProber;
pub use status::RunStatus;
pub use sweep::{QuickCheckReport, find_working_urls, quick_check, sweep_hosts};
