use core::ops::Range;
use core::time::Duration;

/// Time-division schedule used while most of the chain is unreachable.
///
/// Every reachable node derives the same `order` from a shared seed and owns
/// one slot of `pulse_duration` in it. A cycle is all the slots back to back,
/// followed by one idle gap of `sleep_duration` where nobody is active:
///
/// ```text
/// | slot 0 | slot 1 | ... | slot n-1 |     sleep     |
/// 0        p        2p    (n-1)p     np              np + s
/// ```
///
/// The schedule is only valid until pulse mode is exited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulseSchedule {
    /// Length of each active window.
    pub pulse_duration: Duration,

    /// Length of the shared idle gap at the end of each cycle.
    pub sleep_duration: Duration,

    /// Index of the local node in `order`, `None` if it is not part of it.
    pub my_slot: Option<usize>,

    /// Names of the reachable nodes, in slot order.
    pub order: Vec<String>,
}

/// Where the local node stands in the current pulse cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PulsePhase {
    /// The local slot is active for `remaining` more time.
    Active {
        /// Time left in the active window.
        remaining: Duration,
    },

    /// The local slot is inactive and starts again in `next_in`.
    Sleeping {
        /// Time until the local slot becomes active.
        next_in: Duration,
    },

    /// The local node has no slot and never becomes active.
    Abstaining,
}

impl PulseSchedule {
    /// Number of slots in a cycle.
    pub fn total_slots(&self) -> usize {
        self.order.len()
    }

    /// `total_slots * pulse_duration + sleep_duration`.
    pub fn cycle_duration(&self) -> Duration {
        self.pulse_duration * self.total_slots() as u32 + self.sleep_duration
    }

    /// The active window of a slot, as an offset range within the cycle.
    pub fn window(&self, slot: usize) -> Range<Duration> {
        let start = self.pulse_duration * slot as u32;
        start..start + self.pulse_duration
    }

    /// The slot active at `now` (time since the UNIX epoch), if any.
    pub fn active_slot_at(&self, now: Duration) -> Option<usize> {
        let offset = self.offset_in_cycle(now)?;
        let slot = (offset.as_nanos() / self.pulse_duration.as_nanos()) as usize;
        (slot < self.total_slots()).then_some(slot)
    }

    /// Whether the local slot is active at `now` (time since the UNIX epoch).
    pub fn is_active_at(&self, now: Duration) -> bool {
        matches!(self.phase_at(now), PulsePhase::Active { .. })
    }

    /// Where the local node stands in the cycle at `now`.
    pub fn phase_at(&self, now: Duration) -> PulsePhase {
        let (Some(slot), Some(offset)) = (self.my_slot, self.offset_in_cycle(now)) else {
            return PulsePhase::Abstaining;
        };

        if slot >= self.total_slots() {
            return PulsePhase::Abstaining;
        }

        let window = self.window(slot);

        if window.contains(&offset) {
            PulsePhase::Active {
                remaining: window.end - offset,
            }
        } else if offset < window.start {
            PulsePhase::Sleeping {
                next_in: window.start - offset,
            }
        } else {
            PulsePhase::Sleeping {
                next_in: self.cycle_duration() - offset + window.start,
            }
        }
    }

    fn offset_in_cycle(&self, now: Duration) -> Option<Duration> {
        let cycle = self.cycle_duration().as_nanos();

        if cycle == 0 || self.pulse_duration.is_zero() || self.order.is_empty() {
            return None;
        }

        let offset = now.as_nanos() % cycle;
        Some(Duration::new(
            (offset / 1_000_000_000) as u64,
            (offset % 1_000_000_000) as u32,
        ))
    }
}
