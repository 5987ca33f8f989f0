use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, Instrument};

use primus_config::LivenessConfig;

use crate::diagnose::HostCheck;

/// Checks whether a peer is alive.
///
/// Any error, including a timeout, means the peer is dead.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, address: &str) -> bool;
}

#[async_trait]
impl<P> LivenessProbe for Arc<P>
where
    P: LivenessProbe + ?Sized,
{
    async fn probe(&self, address: &str) -> bool {
        self.as_ref().probe(address).await
    }
}

#[async_trait]
impl<P> LivenessProbe for &P
where
    P: LivenessProbe + ?Sized,
{
    async fn probe(&self, address: &str) -> bool {
        (**self).probe(address).await
    }
}

/// Probes the liveness port of a peer with a TCP connect.
///
/// When the connect fails, an optional [`HostCheck`] tells apart a host
/// that is down from a host whose node is down. The outcome of that check
/// is only logged.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    port: u16,
    timeout: Duration,
    host_check: Option<HostCheck>,
}

impl TcpProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            host_check: None,
        }
    }

    pub fn from_config(config: &LivenessConfig) -> Self {
        Self::new(config.port, config.probe_timeout).with_host_check(HostCheck::new(
            config.admin_port,
            config.fallback_timeout,
            config.icmp_fallback,
        ))
    }

    pub fn with_host_check(mut self, host_check: HostCheck) -> Self {
        self.host_check = Some(host_check);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn connect(&self, address: &str) -> Result<(), String> {
        match tokio::time::timeout(self.timeout, TcpStream::connect((address, self.port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.timeout)),
        }
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    #[tracing::instrument(name = "probe", skip(self), fields(port = self.port))]
    async fn probe(&self, address: &str) -> bool {
        match self.connect(address).await {
            Ok(()) => {
                debug!("Peer is alive");
                true
            }
            Err(reason) => {
                debug!(%reason, "Peer did not answer on its liveness port");

                if let Some(host_check) = &self.host_check {
                    spawn_host_check(host_check.clone(), address.to_string());
                }

                false
            }
        }
    }
}

/// Diagnose in the background, so that a failed probe costs no more than
/// the liveness timeout.
fn spawn_host_check(host_check: HostCheck, address: String) {
    tokio::spawn(
        async move {
            let diagnosis = host_check.diagnose(&address).await;
            debug!(%diagnosis, "Host check");
        }
        .in_current_span(),
    );
}
