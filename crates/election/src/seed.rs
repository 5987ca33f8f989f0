//! Seed derivation for the two shuffles.
//!
//! The chain shuffle mixes in entropy only this node knows, so every node
//! may end up with a different order. The pulse shuffle only uses values
//! every healthy node can compute on its own (the current hour and the
//! sorted set of healthy names), so nodes that agree on who is healthy
//! agree on the order without talking to each other.

use std::time::Duration;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha3::{Digest, Sha3_256};

use crate::signer::EntropySigner;

/// First 8 bytes, big-endian, of the SHA3-256 digest of `bytes`.
pub fn derive_seed(bytes: &[u8]) -> u64 {
    let digest = Sha3_256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Sign the entropy, then derive a seed from the signature.
pub fn signed_seed(signer: &dyn EntropySigner, entropy: &[u8]) -> u64 {
    derive_seed(&signer.sign(entropy))
}

/// Shuffle `items` in place with a ChaCha8 RNG seeded with `seed`.
pub fn shuffle_with_seed<T>(items: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// Hours since the UNIX epoch.
pub fn hour_marker(now: Duration) -> u64 {
    now.as_secs() / 3600
}

/// Entropy of the pulse shuffle. Names are sorted so that the result does not
/// depend on the order in which they were observed.
pub fn pulse_entropy<'a>(hour_marker: u64, healthy: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let names = healthy.into_iter().sorted().join(",");
    format!("PULSE:{hour_marker}:{names}").into_bytes()
}

/// Entropy of the chain shuffle: coarse time, precise time and a local nonce.
pub fn shuffle_entropy<'a>(
    now: Duration,
    nonce: u64,
    reachable: impl IntoIterator<Item = &'a str>,
) -> Vec<u8> {
    let names = reachable.into_iter().join(",");
    format!(
        "SHUFFLE:{}:{}:{nonce:016x}:{names}",
        now.as_secs(),
        now.subsec_nanos()
    )
    .into_bytes()
}
