use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::TickError;

/// Wall clock used for shuffle entropy, shuffle hold and pulse schedules.
pub trait Clock: Send + Sync {
    /// Time since the UNIX epoch.
    fn now(&self) -> Result<Duration, TickError>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<Duration, TickError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TickError::ClockBeforeEpoch)
    }
}

impl<C> Clock for std::sync::Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Result<Duration, TickError> {
        self.as_ref().now()
    }
}
