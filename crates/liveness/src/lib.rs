//! Liveness signalling between Primus nodes.
//!
//! Every node serves a dedicated TCP port with a [`LivenessListener`] and
//! probes the same port on its peers with a [`LivenessProbe`]. Reachability
//! of that port is the whole protocol: the listener writes a short
//! acknowledgement and closes the connection.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod diagnose;
mod listener;
mod probe;
mod view;

pub use diagnose::{Diagnosis, HostCheck};
pub use listener::{ListenerError, LivenessListener, ACK};
pub use probe::{LivenessProbe, TcpProbe};
pub use view::LivenessView;
