use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;
use surge_ping::{Client as PingClient, Config as PingConfig, PingIdentifier, PingSequence, ICMP};
use tokio::process::Command;
use tracing::debug;

use crate::config::ProbeMethod;
use crate::models::ProbeResult;

/// One bounded-time reachability check.
///
/// Any failure of the check itself is reported as `reachable: false`.
/// `Err` is reserved for the probing mechanism being unusable, which the
/// session treats as a fault.
pub trait Prober {
    async fn probe(&mut self, target: &str) -> Result<ProbeResult>;
}

/// Prober selected by configuration.
pub enum SystemProber {
    Command(CommandProber),
    Icmp(IcmpProber),
}

impl SystemProber {
    pub fn from_config(method: &ProbeMethod, timeout: Duration) -> Result<Self> {
        Ok(match method {
            ProbeMethod::Command { program, args, .. } => {
                SystemProber::Command(CommandProber::new(program.clone(), args.clone(), timeout))
            }
            ProbeMethod::Icmp { .. } => SystemProber::Icmp(IcmpProber::new(timeout)?),
        })
    }
}

impl Prober for SystemProber {
    async fn probe(&mut self, target: &str) -> Result<ProbeResult> {
        match self {
            SystemProber::Command(p) => p.probe(target).await,
            SystemProber::Icmp(p) => p.probe(target).await,
        }
    }
}

/// Runs an external echo utility and looks only at its exit status.
pub struct CommandProber {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProber {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self { program, args, timeout }
    }
}

impl Prober for CommandProber {
    async fn probe(&mut self, target: &str) -> Result<ProbeResult> {
        let timestamp = Utc::now();

        let mut child = Command::new(&self.program)
            .args(self.args.iter().map(|arg| arg.replace("{target}", target)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn probe command '{}'", self.program))?;

        let reachable = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("{} {} exited with {}", self.program, target, status);
                status.success()
            }
            Ok(Err(e)) => {
                debug!("Waiting on {} failed: {}", self.program, e);
                false
            }
            Err(_) => {
                debug!("{} {} timed out after {:?}", self.program, target, self.timeout);
                let _ = child.kill().await;
                false
            }
        };

        Ok(ProbeResult { timestamp, reachable })
    }
}

/// In-process ICMP echo.
pub struct IcmpProber {
    v4: PingClient,
    v6: Option<PingClient>,
    identifier: PingIdentifier,
    sequence: u16,
    timeout: Duration,
}

impl IcmpProber {
    /// Fails when no IPv4 ICMP socket can be opened. IPv6 is optional.
    pub fn new(timeout: Duration) -> Result<Self> {
        let v4 = PingClient::new(&PingConfig::default())
            .context("Failed to create Ping Client")?;
        let v6 = match PingClient::new(&PingConfig::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("IPv6 ICMP unavailable, IPv6 targets will count as unreachable: {}", e);
                None
            }
        };
        Ok(Self {
            v4,
            v6,
            identifier: PingIdentifier(rand::random()),
            sequence: 0,
            timeout,
        })
    }

    fn client_for(&self, ip: IpAddr) -> Option<&PingClient> {
        match ip {
            IpAddr::V4(_) => Some(&self.v4),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }

    async fn echo(&self, target: &str, sequence: PingSequence) -> bool {
        let ip = match resolve(target).await {
            Ok(ip) => ip,
            Err(e) => {
                debug!("Resolution of {} failed: {}", target, e);
                return false;
            }
        };

        let Some(client) = self.client_for(ip) else {
            debug!("No ICMP client for {}", ip);
            return false;
        };
        let mut pinger = client.pinger(ip, self.identifier).await;
        pinger.timeout(self.timeout);

        let payload = [0u8; 56];
        match pinger.ping(sequence, &payload).await {
            Ok((_, rtt)) => {
                debug!("ICMP reply from {} in {:.1}ms", ip, rtt.as_secs_f64() * 1000.0);
                true
            }
            Err(e) => {
                debug!("ICMP echo to {} failed: {}", ip, e);
                false
            }
        }
    }
}

impl Prober for IcmpProber {
    async fn probe(&mut self, target: &str) -> Result<ProbeResult> {
        let timestamp = Utc::now();
        let sequence = PingSequence(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        Ok(within(timestamp, self.timeout, self.echo(target, sequence)).await)
    }
}

/// Runs `check` under `timeout`; running out of time counts as unreachable.
async fn within<F>(timestamp: DateTime<Utc>, timeout: Duration, check: F) -> ProbeResult
where
    F: Future<Output = bool>,
{
    match tokio::time::timeout(timeout, check).await {
        Ok(reachable) => ProbeResult { timestamp, reachable },
        Err(_) => {
            debug!("Check timed out after {:?}", timeout);
            ProbeResult::unreachable(timestamp)
        }
    }
}

async fn resolve(address: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(ip);
    }
    match tokio::net::lookup_host((address, 0)).await {
        Ok(mut addrs) => addrs
            .next()
            .map(|a| a.ip())
            .ok_or_else(|| "No IP Address Found".into()),
        Err(e) => Err(format!("DNS Resolution Failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(program: &str, args: &[&str], timeout: Duration) -> CommandProber {
        CommandProber::new(
            program.into(),
            args.iter().map(|a| a.to_string()).collect(),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_missing_program_is_a_fault() {
        let mut prober =
            command("definitely-not-a-ping-binary", &["{target}"], Duration::from_secs(1));
        let err = prober.probe("1.1.1.1").await.unwrap_err();
        assert!(err.to_string().contains("Failed to spawn probe command"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_maps_to_reachability() {
        let mut ok = command("true", &["{target}"], Duration::from_secs(5));
        assert!(ok.probe("1.1.1.1").await.unwrap().reachable);

        let mut failing = command("false", &["{target}"], Duration::from_secs(5));
        assert!(!failing.probe("1.1.1.1").await.unwrap().reachable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_counts_as_unreachable() {
        let mut prober = command("sleep", &["5"], Duration::from_millis(50));
        let started = std::time::Instant::now();
        let result = prober.probe("1.1.1.1").await.unwrap();
        assert!(!result.reachable);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timestamp_taken_before_check() {
        let mut prober = command("sleep", &["0.2"], Duration::from_secs(5));
        let before = Utc::now();
        let result = prober.probe("1.1.1.1").await.unwrap();
        assert!(result.timestamp >= before);
        assert!(result.timestamp < Utc::now() - chrono::TimeDelta::milliseconds(100));
    }

    #[tokio::test]
    async fn test_resolve_literal_address() {
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        assert_eq!(resolve("1.1.1.1").await.unwrap(), ip);
        assert!(resolve("::1").await.unwrap().is_ipv6());
    }

    #[tokio::test]
    async fn test_slow_resolution_bounded_by_timeout() {
        let timestamp = Utc::now();
        let result = within(timestamp, Duration::ZERO, async {
            resolve("example.invalid").await.is_ok()
        })
        .await;
        assert_eq!(result, ProbeResult::unreachable(timestamp));
    }

    #[tokio::test]
    async fn test_stalled_check_counts_as_unreachable() {
        let timestamp = Utc::now();
        let started = std::time::Instant::now();
        let result = within(timestamp, Duration::from_millis(20), std::future::pending()).await;
        assert!(!result.reachable);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_completed_check_keeps_its_verdict() {
        let timestamp = Utc::now();
        let result = within(timestamp, Duration::from_secs(1), async { true }).await;
        assert_eq!(result, ProbeResult::reachable(timestamp));
    }

    #[tokio::test]
    async fn test_ipv6_target_without_ipv6_client_is_unreachable() {
        // Needs an ICMP socket; hosts that refuse one skip this test.
        let Ok(mut prober) = IcmpProber::new(Duration::from_millis(200)) else {
            return;
        };
        prober.v6 = None;

        let result = prober.probe("::1").await.unwrap();
        assert!(!result.reachable);
    }
}
