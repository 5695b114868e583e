use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why an ICMP probe could not produce a verdict.
///
/// DNS and ICMP failures both mean "not alive" but point at different
/// problems (resolver config vs. network path), so they stay separate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PingFailure {
    #[error("DNS resolution failed")]
    Dns,

    #[error("{0}")]
    Icmp(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Normalized result of one ICMP probe against a hostname.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingOutcome {
    pub hostname: String,
    pub is_alive: bool,
    /// Mean RTT in milliseconds over the attempts that got a reply.
    pub avg_rtt: Option<f64>,
    /// Percentage of attempts without a reply (0-100).
    pub packet_loss: f64,
    pub error: Option<String>,
}

impl PingOutcome {
    /// Build an outcome from per-attempt RTTs; `None` marks a lost attempt.
    pub fn from_attempts(hostname: impl Into<String>, attempts: &[Option<Duration>]) -> Self {
        let replies: Vec<f64> = attempts
            .iter()
            .flatten()
            .map(|rtt| rtt.as_secs_f64() * 1000.0)
            .collect();

        let packet_loss = if attempts.is_empty() {
            100.0
        } else {
            (attempts.len() - replies.len()) as f64 / attempts.len() as f64 * 100.0
        };

        let is_alive = !replies.is_empty();
        let avg_rtt = is_alive.then(|| replies.iter().sum::<f64>() / replies.len() as f64);

        Self {
            hostname: hostname.into(),
            is_alive,
            avg_rtt,
            packet_loss,
            error: None,
        }
    }

    pub fn failure(hostname: impl Into<String>, failure: PingFailure) -> Self {
        Self {
            hostname: hostname.into(),
            is_alive: false,
            avg_rtt: None,
            packet_loss: 100.0,
            error: Some(failure.to_string()),
        }
    }

    /// Placeholder for an endpoint whose check task died before producing a result.
    pub fn task_failed(hostname: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            hostname: hostname.into(),
            is_alive: false,
            avg_rtt: None,
            packet_loss: 100.0,
            error: Some(format!("Task failed: {reason}")),
        }
    }
}

/// Something that can answer "does this host reply to ICMP echo?".
///
/// Implementations must fold every failure into the returned outcome.
#[async_trait::async_trait]
pub trait EchoProbe: Send + Sync + 'static {
    async fn probe(&self, hostname: &str, timeout: Duration) -> PingOutcome;
}
