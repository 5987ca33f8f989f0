//! The Primus control loop.
//!
//! [`LeaderLoop`] ties the liveness probe, the anomaly signal, the chain
//! shuffler and the pulse scheduler together and notifies a [`RoleHandler`]
//! whenever the role of the local node changes.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod clock;
mod config;
mod error;
mod handler;
mod leader;
mod metrics;
mod node;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use error::{BuildError, TickError};
pub use handler::{LogOnly, RoleHandler};
pub use leader::{LeaderLoop, Params, ShuffleHandle, StopHandle, TickOutcome};
pub use metrics::Metrics;
pub use node::{build, Node};
