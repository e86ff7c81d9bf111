use crate::StoreError;
use blockvault_core::Block;

/// Durable record encoding for blocks. `decode(encode(b))` round-trips every
/// field exactly.
pub fn encode(block: &Block) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(block).map_err(StoreError::Codec)
}

pub fn decode(bytes: &[u8]) -> Result<Block, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::CorruptRecord(e.to_string()))
}
