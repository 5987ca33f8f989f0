use std::time::Duration;

use tracing::info;

use primus_core_types::{PriorityChain, SelfIdentity};

/// The chain used for master resolution, and the original it derives from.
///
/// The working chain is always a subset of the original, in any order.
#[derive(Clone, Debug)]
pub struct WorkingChain {
    original: PriorityChain,
    current: PriorityChain,
    shuffled_at: Option<Duration>,
}

impl WorkingChain {
    pub fn new(original: PriorityChain) -> Self {
        Self {
            current: original.clone(),
            original,
            shuffled_at: None,
        }
    }

    pub fn original(&self) -> &PriorityChain {
        &self.original
    }

    pub fn current(&self) -> &PriorityChain {
        &self.current
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled_at.is_some()
    }

    /// When the current shuffle was installed, as time since the UNIX epoch.
    pub fn shuffled_at(&self) -> Option<Duration> {
        self.shuffled_at
    }

    /// Whether the current shuffle has been held for at least `hold`.
    pub fn held_for(&self, hold: Duration, now: Duration) -> bool {
        self.shuffled_at
            .is_some_and(|at| now.saturating_sub(at) >= hold)
    }

    /// Install a shuffled chain and relocate `me` in it.
    ///
    /// Returns `false`, leaving everything unchanged, if the chain contains
    /// a node unknown to the original.
    pub fn install_shuffle(
        &mut self,
        shuffled: PriorityChain,
        now: Duration,
        me: &mut SelfIdentity,
    ) -> bool {
        if !shuffled.is_subset_of(&self.original) {
            return false;
        }

        self.current = shuffled;
        self.shuffled_at = Some(now);
        me.relocate(&self.current);
        true
    }

    /// Go back to the original chain and relocate `me` in it.
    pub fn restore_original_chain(&mut self, me: &mut SelfIdentity) {
        if self.shuffled_at.take().is_some() {
            info!(chain = %self.original, "Restoring the original chain");
        }

        self.current = self.original.clone();
        me.relocate(&self.current);
    }
}
