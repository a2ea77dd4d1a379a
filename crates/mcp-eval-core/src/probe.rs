//! Pluggable spec-conformance and runtime-liveness checks.
//!
//! Both are external collaborators behind trait seams: the pipeline
//! only depends on the integer-in-[0,100] contract, so real protocol
//! probes can replace the shipped implementations without touching
//! orchestration.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Scores how well the package matches its declared spec document.
#[async_trait]
pub trait SpecCheck: Send + Sync {
    /// Score in [0,100]. Must return 0 when no spec URL was given.
    async fn score(&self, spec_url: Option<&str>) -> u8;
}

/// Scores whether the launched server is alive.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Score in [0,100] for the server expected on `port`.
    async fn score(&self, port: u16) -> u8;
}

/// Baseline spec check: 0 without a spec URL (data-model invariant),
/// a fixed pass with one. Placeholder for a protocol-level
/// conformance client.
pub struct BaselineSpecCheck;

#[async_trait]
impl SpecCheck for BaselineSpecCheck {
    async fn score(&self, spec_url: Option<&str>) -> u8 {
        match spec_url {
            Some(url) => {
                debug!(spec_url = %url, "spec check: baseline pass");
                100
            }
            None => 0,
        }
    }
}

/// TCP connect probe against the launched port.
pub struct TcpLivenessProbe {
    pub connect_timeout: Duration,
}

impl Default for TcpLivenessProbe {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
        }
    }
}

#[async_trait]
impl LivenessProbe for TcpLivenessProbe {
    async fn score(&self, port: u16) -> u8 {
        let addr = format!("127.0.0.1:{port}");
        let alive = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);
        debug!(port, alive, "liveness probe");
        if alive {
            100
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_baseline_spec_check_zero_without_url() {
        assert_eq!(BaselineSpecCheck.score(None).await, 0);
        assert_eq!(
            BaselineSpecCheck.score(Some("https://example.com/spec.json")).await,
            100
        );
    }

    #[tokio::test]
    async fn test_tcp_probe_against_live_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpLivenessProbe::default();
        assert_eq!(probe.score(port).await, 100);
    }

    #[tokio::test]
    async fn test_tcp_probe_against_dead_port() {
        // Bind then drop to find a port that is very likely closed.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpLivenessProbe::default();
        assert_eq!(probe.score(port).await, 0);
    }
}
