use primus_config::ConfigError;
use primus_core_types::ChainError;
use primus_election::SignerError;

/// Failure of a single tick. The loop logs it and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("System clock is before the UNIX epoch")]
    ClockBeforeEpoch,

    #[error("Role handler failed on {transition}: {report:#}")]
    Handler {
        transition: &'static str,
        report: eyre::Report,
    },
}

/// Failure to assemble a control loop from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Invalid shuffle signing key: {0}")]
    Signer(#[from] SignerError),
}
