use std::collections::BTreeSet;
use std::net::{ToSocketAddrs, UdpSocket};

use tracing::{info, warn};

use primus_core_types::{IdentitySource, Position, PriorityChain, SelfIdentity};

/// Find the local node in the original chain.
///
/// In order: the name override (ignoring case), then any chain entry whose
/// address is one of `local_addresses`, then the first entry of the chain.
pub fn resolve_identity(
    chain: &PriorityChain,
    node_name: Option<&str>,
    local_addresses: &BTreeSet<String>,
) -> SelfIdentity {
    if let Some(wanted) = node_name.filter(|name| !name.is_empty()) {
        if let Some((index, node)) = chain.iter().enumerate().find(|(_, n)| n.is_named(wanted)) {
            info!(node = %node.name(), position = index, "Node identified by name");
            return SelfIdentity::new(node, Position::At(index), IdentitySource::Override);
        }

        warn!(name = %wanted, "Configured node name is not in the chain");
    }

    if let Some((index, node)) = chain
        .iter()
        .enumerate()
        .find(|(_, n)| local_addresses.contains(n.address()))
    {
        info!(node = %node.name(), address = %node.address(), position = index, "Node identified by address");
        return SelfIdentity::new(node, Position::At(index), IdentitySource::LocalAddress);
    }

    match chain.iter().next() {
        Some(first) => {
            warn!(node = %first.name(), "Could not identify this node, falling back to the head of the chain");
            SelfIdentity::new(first, Position::At(0), IdentitySource::Fallback)
        }
        None => {
            warn!("Could not identify this node, the chain is empty");
            SelfIdentity::unresolved()
        }
    }
}

/// Addresses this host is known by: the address of the default route, the
/// addresses the host name resolves to, and loopback.
pub fn discover_local_addresses() -> BTreeSet<String> {
    let mut addresses = BTreeSet::from(["127.0.0.1".to_string(), "::1".to_string()]);

    // Connecting a UDP socket sends nothing, it only selects a route
    if let Ok(socket) = UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("8.8.8.8:80").is_ok() {
            if let Ok(local) = socket.local_addr() {
                addresses.insert(local.ip().to_string());
            }
        }
    }

    if let Some(hostname) = hostname() {
        if let Ok(resolved) = (hostname.as_str(), 0).to_socket_addrs() {
            addresses.extend(resolved.map(|addr| addr.ip().to_string()));
        }
    }

    addresses
}

fn hostname() -> Option<String> {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
