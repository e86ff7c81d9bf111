pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Difficulty applied to newly mined blocks. Each block records the value it
/// was mined under, so changing this constant leaves existing blocks valid.
pub const DIFFICULTY_BITS: u32 = 20;

/// Payload of the block minted when a store is created empty.
pub const GENESIS_PAYLOAD: &[u8] = b"Genesis Block";
