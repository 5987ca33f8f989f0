//! Core types shared by every crate of the Primus mastership protocol.
//!
//! A fixed set of replicas agrees on a single master by walking a statically
//! ordered [`PriorityChain`] and probing the liveness of the nodes ranked
//! ahead of them. This crate only holds the data model; the probing, the
//! resolution rule and the control loop live in the other crates.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod chain;
mod identity;
mod node;
mod pulse;
mod role;

pub use chain::{ChainError, PriorityChain};
pub use identity::{IdentitySource, Position, SelfIdentity};
pub use node::NodeDescriptor;
pub use pulse::{PulsePhase, PulseSchedule};
pub use role::{Mode, Role};
