use std::collections::BTreeMap;

use futures::future::join_all;
use tracing::debug;

use primus_core_types::{NodeDescriptor, PriorityChain};

use crate::LivenessProbe;

/// Liveness of every node of a chain, as observed at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LivenessView {
    alive: BTreeMap<String, bool>,
}

impl LivenessView {
    /// Probe every node of the chain once, concurrently.
    pub async fn observe<P>(probe: &P, chain: &PriorityChain) -> Self
    where
        P: LivenessProbe + ?Sized,
    {
        let results = join_all(chain.iter().map(|node| async move {
            let alive = probe.probe(node.address()).await;
            debug!(node = %node.name(), address = %node.address(), alive, "Probed");
            (node.name().to_string(), alive)
        }))
        .await;

        Self {
            alive: results.into_iter().collect(),
        }
    }

    /// Build a view from known outcomes.
    pub fn from_outcomes<I, S>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            alive: outcomes
                .into_iter()
                .map(|(name, alive)| (name.into(), alive))
                .collect(),
        }
    }

    /// Whether the named node answered. Nodes that were not probed are dead.
    pub fn is_alive(&self, name: &str) -> bool {
        self.alive.get(name).copied().unwrap_or(false)
    }

    /// Whether the node answered.
    pub fn is_node_alive(&self, node: &NodeDescriptor) -> bool {
        self.is_alive(node.name())
    }

    /// Number of nodes probed.
    pub fn probed(&self) -> usize {
        self.alive.len()
    }

    /// Number of nodes that answered.
    pub fn alive_count(&self) -> usize {
        self.alive.values().filter(|alive| **alive).count()
    }

    /// Number of nodes that did not answer.
    pub fn dead_count(&self) -> usize {
        self.probed() - self.alive_count()
    }

    /// Names of the nodes that answered, sorted.
    pub fn alive_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.alive
            .iter()
            .filter(|(_, alive)| **alive)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct Fixed {
        alive: HashSet<&'static str>,
        probed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LivenessProbe for Fixed {
        async fn probe(&self, address: &str) -> bool {
            self.probed.lock().unwrap().push(address.to_string());
            self.alive.contains(address)
        }
    }

    #[tokio::test]
    async fn observes_every_node_once() {
        let chain = PriorityChain::new([
            NodeDescriptor::new("a", "10.0.0.1"),
            NodeDescriptor::new("b", "10.0.0.2"),
            NodeDescriptor::new("c", "10.0.0.3"),
        ])
        .unwrap();

        let probe = Fixed {
            alive: HashSet::from(["10.0.0.1", "10.0.0.3"]),
            probed: Mutex::new(Vec::new()),
        };

        let view = LivenessView::observe(&probe, &chain).await;

        assert_eq!(probe.probed.lock().unwrap().len(), 3);
        assert!(view.is_alive("a"));
        assert!(!view.is_alive("b"));
        assert!(view.is_alive("c"));
        assert!(!view.is_alive("unknown"));
        assert_eq!(view.alive_count(), 2);
        assert_eq!(view.dead_count(), 1);
        assert_eq!(view.alive_names().collect::<Vec<_>>(), ["a", "c"]);
    }
}
