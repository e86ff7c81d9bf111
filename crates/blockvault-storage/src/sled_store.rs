use crate::{codec, StoreError};
use blockvault_core::{hash_from_slice, pow, Block, Hash, DIFFICULTY_BITS, GENESIS_PAYLOAD};
use sled::transaction::TransactionError;
use sled::Db;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";
const KEY_TIP: &[u8] = b"tip";

/// Persisted chain: one sled tree mapping 32-byte block hashes to encoded
/// blocks, plus a short sentinel key holding the current tip hash. Ordering
/// is recovered only by walking `prev_hash` links backward from the tip.
pub struct ChainStore {
    db: Db,
    blocks: sled::Tree,
    difficulty_bits: u32,
    // Guards the whole read-tip / mine / commit / advance sequence. Appends
    // are strictly serialized; no two blocks can share a predecessor.
    tip: Mutex<Hash>,
}

impl ChainStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_difficulty(path, DIFFICULTY_BITS)
    }

    /// Opens the store, minting and persisting a genesis block if no tip
    /// exists yet. Idempotent: re-opening an initialized store loads the
    /// existing tip and never mints a second genesis.
    pub fn open_with_difficulty<P: AsRef<Path>>(
        path: P,
        difficulty_bits: u32,
    ) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let blocks = db.open_tree(TREE_BLOCKS)?;
        let tip = match blocks.get(KEY_TIP)? {
            Some(raw) => hash_from_slice(&raw).ok_or_else(|| {
                StoreError::CorruptRecord(format!(
                    "tip pointer has {} bytes, expected 32",
                    raw.len()
                ))
            })?,
            None => {
                let genesis = pow::mine(Block::genesis(GENESIS_PAYLOAD, difficulty_bits))?;
                Self::commit(&blocks, &genesis)?;
                db.flush()?;
                info!("minted genesis block {}", hex::encode(genesis.hash));
                genesis.hash
            }
        };
        Ok(Self {
            db,
            blocks,
            difficulty_bits,
            tip: Mutex::new(tip),
        })
    }

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> Hash {
        *self.tip.lock().expect("tip lock poisoned")
    }

    pub fn append(&self, payload: impl Into<Vec<u8>>) -> Result<Block, StoreError> {
        self.append_with_cancel(payload, &AtomicBool::new(false))
    }

    /// Mines and stores one block referencing the current tip. The record and
    /// the tip pointer land in a single sled transaction, so a reader never
    /// observes one without the other. `cancel` aborts the nonce search
    /// between attempts and leaves the store untouched.
    pub fn append_with_cancel(
        &self,
        payload: impl Into<Vec<u8>>,
        cancel: &AtomicBool,
    ) -> Result<Block, StoreError> {
        let mut tip = self.tip.lock().expect("tip lock poisoned");
        let candidate = Block::prepare(payload.into(), tip.to_vec(), self.difficulty_bits);
        let block = pow::mine_with_cancel(candidate, cancel)?;
        Self::commit(&self.blocks, &block)?;
        self.db.flush()?;
        *tip = block.hash;
        debug!("appended block {}", hex::encode(block.hash));
        Ok(block)
    }

    /// Decoded block for a hash. Absent records are `NotFound`; undecodable
    /// bytes are `CorruptRecord`, never a fabricated default block.
    pub fn get(&self, hash: &Hash) -> Result<Block, StoreError> {
        match self.blocks.get(hash)? {
            Some(raw) => codec::decode(&raw),
            None => Err(StoreError::NotFound(hex::encode(hash))),
        }
    }

    /// Backward walk from the current tip to genesis, newest first. Finite
    /// and non-restartable; call again for a fresh traversal.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            store: self,
            cursor: Some(self.tip()),
        }
    }

    fn commit(blocks: &sled::Tree, block: &Block) -> Result<(), StoreError> {
        let bytes = codec::encode(block)?;
        let res: sled::transaction::TransactionResult<()> = blocks.transaction(|tx| {
            tx.insert(&block.hash[..], bytes.as_slice())?;
            tx.insert(KEY_TIP, &block.hash[..])?;
            Ok(())
        });
        match res {
            Ok(()) => Ok(()),
            Err(TransactionError::Storage(e)) => Err(StoreError::Unavailable(e)),
            Err(TransactionError::Abort(())) => unreachable!("commit never aborts"),
        }
    }
}

/// Lazy newest-to-oldest traversal. The genesis block (empty `prev_hash`) is
/// the last item; a fetch or decode failure is yielded once and ends the walk.
pub struct ChainIter<'a> {
    store: &'a ChainStore,
    cursor: Option<Hash>,
}

impl Iterator for ChainIter<'_> {
    type Item = Result<Block, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        let block = match self.store.get(&cursor) {
            Ok(block) => block,
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            match hash_from_slice(&block.prev_hash) {
                Some(prev) => self.cursor = Some(prev),
                None => {
                    return Some(Err(StoreError::CorruptRecord(format!(
                        "block {} has a {}-byte predecessor hash",
                        hex::encode(block.hash),
                        block.prev_hash.len()
                    ))))
                }
            }
        }
        Some(Ok(block))
    }
}
