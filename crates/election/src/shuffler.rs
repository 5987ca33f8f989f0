use std::time::Duration;

use tracing::{error, warn};

use primus_core_types::PriorityChain;
use primus_liveness::LivenessView;

use crate::seed::{shuffle_entropy, shuffle_with_seed, signed_seed};
use crate::signer::{EntropySigner, Unsigned};

/// Node-local reordering of the chain, used when an attack is suspected.
///
/// The seed includes entropy no other node knows, so different nodes may
/// pick different orders. An outside observer cannot predict the order.
pub struct ChainShuffler {
    signer: Box<dyn EntropySigner>,
}

impl Default for ChainShuffler {
    fn default() -> Self {
        Self::new(Unsigned)
    }
}

impl ChainShuffler {
    pub fn new(signer: impl EntropySigner + 'static) -> Self {
        Self {
            signer: Box::new(signer),
        }
    }

    /// Shuffle the reachable nodes of `original`.
    ///
    /// Returns `None` if no node is reachable.
    pub fn shuffle(
        &self,
        original: &PriorityChain,
        view: &LivenessView,
        now: Duration,
    ) -> Option<PriorityChain> {
        self.shuffle_with_nonce(original, view, now, rand::random())
    }

    pub fn shuffle_with_nonce(
        &self,
        original: &PriorityChain,
        view: &LivenessView,
        now: Duration,
        nonce: u64,
    ) -> Option<PriorityChain> {
        let reachable = original.filter(|node| {
            let alive = view.is_node_alive(node);
            if !alive {
                warn!(node = %node.name(), address = %node.address(), "Excluded from shuffle, unreachable");
            }
            alive
        });

        if reachable.is_empty() {
            error!("No reachable node to shuffle, keeping the current chain");
            return None;
        }

        let entropy = shuffle_entropy(now, nonce, reachable.names());
        let seed = signed_seed(self.signer.as_ref(), &entropy);

        Some(reachable.permuted(|nodes| shuffle_with_seed(nodes, seed)))
    }
}
