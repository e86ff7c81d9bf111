use crate::{digest, Block, Hash};
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    #[error("nonce space exhausted before meeting the difficulty target")]
    NonceExhausted,
    #[error("mining cancelled before a valid nonce was found")]
    Cancelled,
}

/// Numeric threshold a block hash must fall below: `2^(256 - bits)`.
/// Higher `bits` means a smaller target and a longer search.
pub fn target_for_bits(bits: u32) -> BigUint {
    BigUint::from(1u8) << (256 - bits as usize)
}

pub fn hash_meets_target(hash: &Hash, target: &BigUint) -> bool {
    BigUint::from_bytes_be(hash) < *target
}

/// Seals a block by searching nonces sequentially from 0 until its canonical
/// bytes hash below the target for its recorded difficulty. The recorded
/// nonce is therefore the smallest satisfying one.
pub fn mine(block: Block) -> Result<Block, PowError> {
    mine_with_cancel(block, &AtomicBool::new(false))
}

/// Like `mine`, with a cancellation point between nonce attempts. An aborted
/// search returns `PowError::Cancelled` and leaves nothing to clean up, since
/// mining happens before any store write.
pub fn mine_with_cancel(mut block: Block, cancel: &AtomicBool) -> Result<Block, PowError> {
    let target = target_for_bits(block.difficulty_bits);
    for nonce in 0..=u64::MAX {
        if cancel.load(Ordering::Relaxed) {
            return Err(PowError::Cancelled);
        }
        let hash = digest(&block.pow_bytes(nonce));
        if hash_meets_target(&hash, &target) {
            block.nonce = nonce;
            block.hash = hash;
            info!(
                "mined block with nonce {} and hash {}",
                nonce,
                hex::encode(hash)
            );
            return Ok(block);
        }
    }
    Err(PowError::NonceExhausted)
}

/// Recomputes the digest from the block's stored nonce and difficulty and
/// checks it against both the target and the stored hash.
pub fn verify(block: &Block) -> bool {
    let hash = digest(&block.pow_bytes(block.nonce));
    hash == block.hash && hash_meets_target(&hash, &target_for_bits(block.difficulty_bits))
}
