pub mod codec;
pub mod sled_store;

use blockvault_core::PowError;
use thiserror::Error;

pub use sled_store::{ChainIter, ChainStore};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage cannot be opened, read, or written. Fatal to the
    /// operation in progress; never retried internally.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sled::Error),

    /// The requested hash has no record. Recoverable by the caller.
    #[error("block {0} not found")]
    NotFound(String),

    /// Stored bytes fail to decode into a block. Surfaced as-is; the store
    /// never substitutes a default block for bytes it cannot read.
    #[error("corrupt block record: {0}")]
    CorruptRecord(String),

    #[error("failed to encode block: {0}")]
    Codec(#[source] bincode::Error),

    #[error(transparent)]
    Pow(#[from] PowError),
}
