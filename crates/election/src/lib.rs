//! Master election over a priority chain.
//!
//! - [`resolve_identity`] finds the local node in the chain.
//! - [`resolve_master`] decides whether the local node is master: the
//!   earliest reachable node of the working chain is.
//! - [`ChainShuffler`] reorders the reachable nodes with node-local entropy
//!   when an attack is suspected.
//! - [`PulseScheduler`] takes over when most of the chain is unreachable:
//!   healthy nodes take turns being master on a schedule they all derive
//!   from the same seed.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod identity;
mod pulse;
mod resolve;
mod shuffler;
mod working;

pub mod seed;
pub mod signer;

pub use identity::{discover_local_addresses, resolve_identity};
pub use pulse::{check_majority_outage, observe_outage, MajorityOutage, PulseScheduler};
pub use resolve::{am_i_the_master, chain_status, expected_master, resolve_master};
pub use shuffler::ChainShuffler;
pub use signer::{Ed25519Signer, EntropySigner, SharedSecret, SignerError, Unsigned};
pub use working::WorkingChain;
