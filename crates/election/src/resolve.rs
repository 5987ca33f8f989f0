use itertools::Itertools;
use tracing::debug;

use primus_core_types::{NodeDescriptor, PriorityChain, SelfIdentity};
use primus_liveness::{LivenessProbe, LivenessView};

/// Whether `me` is the master of `chain` given the observed liveness.
///
/// Walks the chain in order: reaching `me` means every node ahead is dead,
/// and finding a live node first means deferring to it. A node that is not
/// in the chain is never master.
pub fn resolve_master(chain: &PriorityChain, me: &SelfIdentity, view: &LivenessView) -> bool {
    if !me.position().is_found() {
        return false;
    }

    for node in chain {
        if node.name() == me.name() {
            return true;
        }

        if view.is_node_alive(node) {
            debug!(node = %node.name(), "Node ahead is alive, deferring");
            return false;
        }
    }

    false
}

/// Same as [`resolve_master`], but probes lazily and stops at the first
/// live node ahead.
pub async fn am_i_the_master<P>(chain: &PriorityChain, me: &SelfIdentity, probe: &P) -> bool
where
    P: LivenessProbe + ?Sized,
{
    if !me.position().is_found() {
        return false;
    }

    for node in chain {
        if node.name() == me.name() {
            return true;
        }

        if probe.probe(node.address()).await {
            debug!(node = %node.name(), "Node ahead is alive, deferring");
            return false;
        }
    }

    false
}

/// The earliest live node of the chain.
pub fn expected_master<'a>(chain: &'a PriorityChain, view: &LivenessView) -> Option<&'a NodeDescriptor> {
    chain.iter().find(|node| view.is_node_alive(node))
}

/// One-line status of the chain: `● amsterdam | ○ moscow (self)`.
pub fn chain_status(chain: &PriorityChain, me: &SelfIdentity, view: &LivenessView) -> String {
    chain
        .iter()
        .map(|node| {
            let marker = if view.is_node_alive(node) { '●' } else { '○' };
            let suffix = if node.name() == me.name() { " (self)" } else { "" };
            format!("{marker} {}{suffix}", node.name())
        })
        .join(" | ")
}
