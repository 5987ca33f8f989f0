//! Keying of the entropy that seeds the shuffles.

use ed25519_consensus::SigningKey;
use sha3::{Digest, Sha3_256};

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid hex in signing key: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Signing key must be 32 bytes, got {0}")]
    Length(usize),
}

/// Transforms entropy before it is hashed into a seed.
pub trait EntropySigner: Send + Sync {
    fn sign(&self, entropy: &[u8]) -> Vec<u8>;
}

/// Leaves the entropy untouched.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unsigned;

impl EntropySigner for Unsigned {
    fn sign(&self, entropy: &[u8]) -> Vec<u8> {
        entropy.to_vec()
    }
}

/// Signs the entropy with a node-local ed25519 key.
///
/// Nobody without the key can predict the resulting seed.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Parse a hex-encoded 32-byte seed.
    pub fn from_hex(seed: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(seed.trim())?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignerError::Length(bytes.len()))?;

        Ok(Self::new(SigningKey::from(seed)))
    }

    /// A fresh key from the operating system RNG.
    pub fn generate() -> Self {
        Self::new(SigningKey::new(rand::thread_rng()))
    }
}

impl EntropySigner for Ed25519Signer {
    fn sign(&self, entropy: &[u8]) -> Vec<u8> {
        self.key.sign(entropy).to_bytes().to_vec()
    }
}

/// Keys the entropy with a secret shared by the whole cluster.
///
/// Nodes with the same secret and the same entropy get the same output.
pub struct SharedSecret {
    secret: Vec<u8>,
}

impl SharedSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl EntropySigner for SharedSecret {
    fn sign(&self, entropy: &[u8]) -> Vec<u8> {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.secret);
        hasher.update(entropy);
        hasher.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_is_deterministic_per_key() {
        let key = "0101010101010101010101010101010101010101010101010101010101010101";
        let a = Ed25519Signer::from_hex(key).unwrap();
        let b = Ed25519Signer::from_hex(key).unwrap();

        assert_eq!(a.sign(b"entropy"), b.sign(b"entropy"));
        assert_eq!(a.sign(b"entropy").len(), 64);

        let other = Ed25519Signer::generate();
        assert_ne!(a.sign(b"entropy"), other.sign(b"entropy"));
    }

    #[test]
    fn bad_keys() {
        assert!(matches!(
            Ed25519Signer::from_hex("zz"),
            Err(SignerError::Hex(_))
        ));
        assert!(matches!(
            Ed25519Signer::from_hex("0101"),
            Err(SignerError::Length(2))
        ));
    }

    #[test]
    fn shared_secret_depends_on_the_secret() {
        let a = SharedSecret::new("alpha");
        let b = SharedSecret::new("alpha");
        let c = SharedSecret::new("beta");

        assert_eq!(a.sign(b"entropy"), b.sign(b"entropy"));
        assert_ne!(a.sign(b"entropy"), c.sign(b"entropy"));
        assert_eq!(Unsigned.sign(b"entropy"), b"entropy");
    }
}
