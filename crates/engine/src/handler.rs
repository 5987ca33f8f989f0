use std::sync::Arc;

use async_trait::async_trait;

/// Receives role transitions. This is the seam to the protected service.
///
/// Each method is invoked once per transition, inline between ticks, so
/// implementations should return promptly. They must tolerate a spurious call.
#[async_trait]
pub trait RoleHandler: Send + Sync {
    /// The local node became master.
    ///
    /// `term` increases on every promotion of this process and can be used
    /// by the protected service to fence work started under an older term.
    async fn on_become_master(&self, term: u64) -> eyre::Result<()>;

    /// The local node is no longer master.
    async fn on_become_standby(&self) -> eyre::Result<()>;
}

#[async_trait]
impl<H> RoleHandler for Arc<H>
where
    H: RoleHandler + ?Sized,
{
    async fn on_become_master(&self, term: u64) -> eyre::Result<()> {
        self.as_ref().on_become_master(term).await
    }

    async fn on_become_standby(&self) -> eyre::Result<()> {
        self.as_ref().on_become_standby().await
    }
}

/// Only logs transitions.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogOnly;

#[async_trait]
impl RoleHandler for LogOnly {
    async fn on_become_master(&self, term: u64) -> eyre::Result<()> {
        tracing::info!(term, "Now serving as master");
        Ok(())
    }

    async fn on_become_standby(&self) -> eyre::Result<()> {
        tracing::info!("Now on standby");
        Ok(())
    }
}
