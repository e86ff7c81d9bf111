pub mod constants;
pub mod pow;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub use constants::{DIFFICULTY_BITS, GENESIS_PAYLOAD, HASH_SIZE};
pub use pow::PowError;

pub type Hash = [u8; 32];

/// One record of the append-only chain. `prev_hash` is empty exactly for the
/// genesis block; every other block carries the 32-byte hash of its
/// predecessor. `difficulty_bits` is recorded per block so verification stays
/// correct if the process-wide constant changes between mints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub payload: Vec<u8>,
    pub prev_hash: Vec<u8>,
    pub hash: Hash,
    pub timestamp: u64,
    pub difficulty_bits: u32,
    pub nonce: u64,
}

impl Block {
    /// An unsealed candidate: timestamp taken now, nonce and hash unset until
    /// `pow::mine` seals it.
    pub fn prepare(payload: Vec<u8>, prev_hash: Vec<u8>, difficulty_bits: u32) -> Self {
        Self {
            payload,
            prev_hash,
            hash: [0u8; HASH_SIZE],
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time went backwards")
                .as_secs(),
            difficulty_bits,
            nonce: 0,
        }
    }

    pub fn genesis(payload: impl Into<Vec<u8>>, difficulty_bits: u32) -> Self {
        Self::prepare(payload.into(), Vec::new(), difficulty_bits)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// Canonical bytes hashed during mining and verification:
    /// `prev_hash || payload || be64(timestamp) || be32(difficulty_bits) || be64(nonce)`.
    pub fn pow_bytes(&self, nonce: u64) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(self.prev_hash.len() + self.payload.len() + 8 + 4 + 8);
        bytes.extend_from_slice(&self.prev_hash);
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.difficulty_bits.to_be_bytes());
        bytes.extend_from_slice(&nonce.to_be_bytes());
        bytes
    }

    /// Re-checks proof-of-work from the block's own recorded nonce and
    /// difficulty, without trusting the store it came from.
    pub fn verify(&self) -> bool {
        pow::verify(self)
    }
}

pub fn digest(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&out[..]);
    hash
}

/// Exact-length conversion for hashes coming back out of storage.
pub fn hash_from_slice(bytes: &[u8]) -> Option<Hash> {
    bytes.try_into().ok()
}
