use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use log::{debug, error, warn};
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};

use crate::logging::{Tone, highlight};
use crate::ping::{EchoProbe, PingFailure, PingOutcome};

pub const DEFAULT_ATTEMPTS: u16 = 3;

const PAYLOAD: [u8; 56] = [0; 56];

static NEXT_IDENTIFIER: AtomicU16 = AtomicU16::new(1);

/// Identifiers only need to differ between pingers alive at the same time.
fn next_identifier() -> PingIdentifier {
    let base = std::process::id() as u16;
    PingIdentifier(base.wrapping_add(NEXT_IDENTIFIER.fetch_add(1, Ordering::Relaxed)))
}

/// Validate a hostname: only alphanumerics, dots, hyphens and underscores.
/// A trailing `:port` is dropped. Returns None if nothing usable is left.
fn sanitize_hostname(hostname: &str) -> Option<&str> {
    let hostname = hostname.split(':').next().unwrap_or(hostname).trim();

    let valid = !hostname.is_empty()
        && hostname
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'));

    valid.then_some(hostname)
}

/// Fold per-attempt results into an outcome.
///
/// Timeouts and other errors both count as lost attempts. When nothing
/// replied and at least one attempt failed with something other than a
/// timeout, the last such error wins.
fn fold_attempts(
    hostname: &str,
    attempts: &[Result<Duration, SurgeError>],
) -> Result<PingOutcome, PingFailure> {
    let mut last_error = None;
    let rtts: Vec<Option<Duration>> = attempts
        .iter()
        .map(|attempt| match attempt {
            Ok(rtt) => Some(*rtt),
            Err(SurgeError::Timeout { .. }) => None,
            Err(e) => {
                last_error = Some(e.to_string());
                None
            }
        })
        .collect();

    let outcome = PingOutcome::from_attempts(hostname, &rtts);
    match last_error {
        Some(e) if !outcome.is_alive => Err(PingFailure::Icmp(e)),
        _ => Ok(outcome),
    }
}

async fn resolve_target(target: &str) -> Result<IpAddr, PingFailure> {
    let target = target.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    let hostname = sanitize_hostname(target)
        .ok_or_else(|| PingFailure::Unexpected(format!("invalid hostname {target:?}")))?;

    match tokio::net::lookup_host((hostname, 0)).await {
        Ok(mut addrs) => addrs.next().map(|addr| addr.ip()).ok_or(PingFailure::Dns),
        Err(e) => {
            debug!("Lookup of {hostname} failed: {e}");
            Err(PingFailure::Dns)
        }
    }
}

/// ICMP echo prober backed by `surge-ping`.
///
/// Needs raw or datagram ICMP socket permission; without it every probe
/// reports an ICMP error instead of failing the run.
#[derive(Debug, Clone)]
pub struct IcmpProber {
    attempt_count: u16,
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS)
    }
}

impl IcmpProber {
    pub fn new(attempt_count: u16) -> Self {
        Self { attempt_count }
    }

    async fn execute_ping(&self, hostname: &str, timeout: Duration) -> Result<PingOutcome, PingFailure> {
        if self.attempt_count == 0 {
            return Err(PingFailure::Unexpected("attempt count must be at least 1".into()));
        }

        let target_ip = resolve_target(hostname).await?;

        let config = match target_ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| PingFailure::Icmp(e.to_string()))?;

        let mut pinger = client.pinger(target_ip, next_identifier()).await;
        pinger.timeout(timeout);

        let mut attempts = Vec::with_capacity(self.attempt_count as usize);
        for seq in 0..self.attempt_count {
            let attempt = pinger.ping(PingSequence(seq), &PAYLOAD).await;
            if let Err(e) = &attempt {
                debug!("ICMP attempt {seq} to {hostname} failed: {e}");
            }
            attempts.push(attempt.map(|(_, rtt)| rtt));
        }

        fold_attempts(hostname, &attempts)
    }
}

#[async_trait::async_trait]
impl EchoProbe for IcmpProber {
    async fn probe(&self, hostname: &str, timeout: Duration) -> PingOutcome {
        debug!(
            "Attempting ping: {} (timeout={:.1}s)",
            highlight(hostname, Tone::Debug),
            timeout.as_secs_f64()
        );

        match self.execute_ping(hostname, timeout).await {
            Ok(outcome) => {
                match outcome.avg_rtt {
                    Some(rtt) => debug!(
                        "Ping successful: {} (RTT: {rtt:.2}ms)",
                        highlight(hostname, Tone::Debug)
                    ),
                    None => debug!(
                        "Ping failed: {} (packet loss: {}%)",
                        highlight(hostname, Tone::Debug),
                        outcome.packet_loss
                    ),
                }
                outcome
            }
            Err(failure) => {
                match &failure {
                    PingFailure::Dns => {
                        warn!("DNS resolution failed: {}", highlight(hostname, Tone::Warning))
                    }
                    PingFailure::Icmp(e) => {
                        error!("ICMP error for {}: {e}", highlight(hostname, Tone::Error))
                    }
                    PingFailure::Unexpected(e) => {
                        error!("Unexpected ping error for {}: {e}", highlight(hostname, Tone::Error))
                    }
                }
                PingOutcome::failure(hostname, failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_sanitize_hostname() {
        assert_eq!(sanitize_hostname("example.com"), Some("example.com"));
        assert_eq!(sanitize_hostname("example.com:8080"), Some("example.com"));
        assert_eq!(sanitize_hostname("ftp-1.example.net"), Some("ftp-1.example.net"));
        assert_eq!(sanitize_hostname("my_host.example"), Some("my_host.example"));
        assert_eq!(sanitize_hostname(""), None);
        assert_eq!(sanitize_hostname("bad host"), None);
        assert_eq!(sanitize_hostname("evil;rm"), None);
    }

    #[tokio::test]
    async fn test_resolve_literal_ips() {
        assert_eq!(
            resolve_target("127.0.0.1").await,
            Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        assert_eq!(resolve_target("::1").await, Ok(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(resolve_target("[::1]").await, Ok(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[tokio::test]
    async fn test_resolve_invalid_hostname_is_unexpected() {
        let err = resolve_target("not a host").await.unwrap_err();
        assert!(matches!(err, PingFailure::Unexpected(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_host_reports_dns_failure() {
        let outcome = IcmpProber::default()
            .probe("does-not-exist.invalid", Duration::from_millis(200))
            .await;

        assert!(!outcome.is_alive);
        assert_eq!(outcome.packet_loss, 100.0);
        assert_eq!(outcome.error.as_deref(), Some("DNS resolution failed"));
    }

    #[tokio::test]
    async fn test_underscore_host_reaches_dns() {
        let outcome = IcmpProber::default()
            .probe("my_host.does-not-exist.invalid", Duration::from_millis(200))
            .await;

        assert!(!outcome.is_alive);
        assert_eq!(outcome.error.as_deref(), Some("DNS resolution failed"));
    }

    fn timeout() -> SurgeError {
        SurgeError::Timeout { seq: PingSequence(0) }
    }

    fn unreachable() -> SurgeError {
        SurgeError::from(std::io::Error::other("Network unreachable"))
    }

    #[test]
    fn test_fold_error_ignored_when_a_reply_arrived() {
        let attempts = [
            Ok(Duration::from_millis(8)),
            Err(unreachable()),
            Err(timeout()),
        ];
        let outcome = fold_attempts("a.example", &attempts).unwrap();

        assert!(outcome.is_alive);
        assert_eq!(outcome.error, None);
        assert!((outcome.avg_rtt.unwrap() - 8.0).abs() < 1e-9);
        assert!((outcome.packet_loss - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fold_all_errors_keeps_the_last() {
        let last = SurgeError::NetworkError;
        let expected = last.to_string();
        let attempts = [Err(unreachable()), Err(timeout()), Err(last)];

        assert_eq!(
            fold_attempts("a.example", &attempts),
            Err(PingFailure::Icmp(expected))
        );
    }

    #[test]
    fn test_fold_all_timeouts_is_plain_loss() {
        let attempts = [Err(timeout()), Err(timeout()), Err(timeout())];
        let outcome = fold_attempts("a.example", &attempts).unwrap();

        assert!(!outcome.is_alive);
        assert_eq!(outcome.avg_rtt, None);
        assert_eq!(outcome.packet_loss, 100.0);
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_unexpected() {
        let outcome = IcmpProber::new(0)
            .probe("127.0.0.1", Duration::from_millis(200))
            .await;

        assert!(!outcome.is_alive);
        assert!(outcome.error.unwrap().starts_with("Unexpected error: "));
    }

    #[test]
    fn test_identifiers_differ() {
        assert_ne!(next_identifier().0, next_identifier().0);
    }
}
