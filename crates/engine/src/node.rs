use std::net::SocketAddr;

use tracing::info;

use primus_config::Config;
use primus_election::{
    discover_local_addresses, resolve_identity, ChainShuffler, Ed25519Signer, PulseScheduler,
};
use primus_liveness::{LivenessListener, TcpProbe};
use primus_metrics::SharedRegistry;

use crate::{BuildError, EngineConfig, LeaderLoop, Metrics, Params, RoleHandler, SystemClock};

/// A control loop wired to the network and the system clock.
pub type Node<H> = LeaderLoop<TcpProbe, H, SystemClock>;

/// Assemble the control loop of this process from its configuration.
///
/// Metrics are registered in `registry`.
pub fn build<H>(config: &Config, handler: H, registry: &SharedRegistry) -> Result<Node<H>, BuildError>
where
    H: RoleHandler,
{
    config.validate()?;

    let original = config.original_chain()?;

    let mut local_addresses = discover_local_addresses();
    local_addresses.extend(config.identity.local_addresses.iter().cloned());

    let me = resolve_identity(
        &original,
        config.identity.node_name.as_deref(),
        &local_addresses,
    );

    let shuffler = match &config.election.shuffle.signing_key {
        Some(key) => ChainShuffler::new(Ed25519Signer::from_hex(key)?),
        None => ChainShuffler::default(),
    };

    let listener = config.liveness.listener_enabled.then(|| {
        LivenessListener::new(SocketAddr::new(
            config.liveness.listen_addr,
            config.liveness.port,
        ))
    });

    let engine_config = EngineConfig::new(&config.election, original.len());

    info!(
        node = %me.name(),
        source = ?me.source(),
        detector = ?config.anomaly.detector,
        outage_threshold = engine_config.outage_threshold,
        "Leader election configured"
    );

    Ok(LeaderLoop::new(Params {
        config: engine_config,
        original,
        me,
        probe: TcpProbe::from_config(&config.liveness),
        signal: primus_anomaly::from_config(&config.anomaly),
        shuffler,
        scheduler: PulseScheduler::from_config(&config.election.pulse),
        handler,
        clock: SystemClock,
        metrics: Metrics::register(registry),
        listener,
    }))
}

#[cfg(test)]
mod tests {
    use primus_config::NodeConfig;
    use primus_core_types::{IdentitySource, Mode, Position, Role};

    use super::*;
    use crate::LogOnly;

    fn config() -> Config {
        Config {
            chain: vec![
                NodeConfig {
                    name: "amsterdam".into(),
                    address: "192.0.2.1".into(),
                },
                NodeConfig {
                    name: "moscow".into(),
                    address: "192.0.2.2".into(),
                },
            ],
            ..Config::default()
        }
    }

    #[test]
    fn builds_from_config() {
        let mut config = config();
        config.identity.node_name = Some("Moscow".into());
        config.liveness.listener_enabled = false;

        let node = build(&config, LogOnly, &SharedRegistry::default()).unwrap();

        assert_eq!(node.identity().name(), "moscow");
        assert_eq!(node.identity().position(), Position::At(1));
        assert_eq!(node.identity().source(), IdentitySource::Override);
        assert_eq!(node.role(), Role::Standby);
        assert_eq!(node.mode(), Mode::Normal);
        assert!(node.listener().is_none());
    }

    #[test]
    fn unknown_name_falls_through_to_addresses() {
        let mut config = config();
        config.identity.node_name = Some("paris".into());
        config.identity.local_addresses = vec!["192.0.2.2".into()];
        config.liveness.listener_enabled = false;

        let node = build(&config, LogOnly, &SharedRegistry::default()).unwrap();

        assert_eq!(node.identity().name(), "moscow");
        assert_eq!(node.identity().position(), Position::At(1));
        assert_eq!(node.identity().source(), IdentitySource::LocalAddress);
    }

    #[test]
    fn rejects_bad_signing_key() {
        let mut config = config();
        config.election.shuffle.signing_key = Some("not hex".into());

        let result = build(&config, LogOnly, &SharedRegistry::default());
        assert!(matches!(result, Err(BuildError::Signer(_))));
    }

    #[test]
    fn rejects_invalid_config() {
        let result = build(&Config::default(), LogOnly, &SharedRegistry::default());
        assert!(matches!(result, Err(BuildError::Config(_))));
    }
}
