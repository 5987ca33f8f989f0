use core::fmt;
use std::process::Stdio;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;

/// Outcome of a [`HostCheck`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Diagnosis {
    /// The host answered an ICMP echo, but not on the liveness port.
    ServiceDownHostUpIcmp,

    /// The host accepted a connection on the administrative port,
    /// but not on the liveness port.
    ServiceDownHostUpAdmin,

    /// Nothing answered.
    HostDown,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceDownHostUpIcmp => f.write_str("host up (icmp), node down"),
            Self::ServiceDownHostUpAdmin => f.write_str("host up (admin port), node down"),
            Self::HostDown => f.write_str("host down"),
        }
    }
}

/// Host-level reachability check run after a failed liveness probe.
#[derive(Clone, Debug)]
pub struct HostCheck {
    admin_port: u16,
    timeout: Duration,
    icmp: bool,
}

impl HostCheck {
    pub fn new(admin_port: u16, timeout: Duration, icmp: bool) -> Self {
        Self {
            admin_port,
            timeout,
            icmp,
        }
    }

    pub async fn diagnose(&self, address: &str) -> Diagnosis {
        if self.icmp && self.ping(address).await {
            return Diagnosis::ServiceDownHostUpIcmp;
        }

        if self.connect_admin(address).await {
            return Diagnosis::ServiceDownHostUpAdmin;
        }

        Diagnosis::HostDown
    }

    async fn ping(&self, address: &str) -> bool {
        let wait = self.timeout.as_secs().max(1).to_string();

        let child = Command::new("ping")
            .args(["-c", "1", "-W", &wait, address])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        // One extra second for process startup
        match tokio::time::timeout(self.timeout + Duration::from_secs(1), child).await {
            Ok(Ok(status)) => status.success(),
            _ => false,
        }
    }

    async fn connect_admin(&self, address: &str) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect((address, self.admin_port))).await,
            Ok(Ok(_))
        )
    }
}
