//! Status command

use color_eyre::eyre::Result;

use primus_config::Config;
use primus_election::{
    am_i_the_master, chain_status, discover_local_addresses, expected_master, observe_outage,
    resolve_identity,
};
use primus_liveness::{LivenessView, TcpProbe};

/// Probe the chain once and print what this node would do.
pub async fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let chain = config.original_chain()?;

    let mut local_addresses = discover_local_addresses();
    local_addresses.extend(config.identity.local_addresses.iter().cloned());

    let me = resolve_identity(
        &chain,
        config.identity.node_name.as_deref(),
        &local_addresses,
    );

    let probe = TcpProbe::from_config(&config.liveness);
    let view = LivenessView::observe(&probe, &chain).await;

    let threshold = config.election.majority.threshold(chain.len());
    let outage = observe_outage(&chain, &view, threshold);

    println!("Chain:    {}", chain_status(&chain, &me, &view));
    println!("Self:     {} at {} ({:?})", me.name(), me.position(), me.source());
    println!(
        "Expected: {}",
        expected_master(&chain, &view).map_or("none", |node| node.name())
    );

    if outage.is_outage() {
        println!("Outage:   {outage}, nodes would pulse");
    } else {
        // Probed again, lazily, the way a single tick would decide
        let master = am_i_the_master(&chain, &me, &probe).await;
        println!("Master:   {}", if master { "yes" } else { "no" });
    }

    Ok(())
}
