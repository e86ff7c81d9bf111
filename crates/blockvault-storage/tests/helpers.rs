use blockvault_storage::ChainStore;
use tempfile::{tempdir, TempDir};

/// Low difficulty so test mining finishes in a handful of hash attempts.
pub const TEST_BITS: u32 = 8;

pub fn create_temp_store() -> (TempDir, ChainStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = ChainStore::open_with_difficulty(temp_dir.path(), TEST_BITS)
        .expect("Failed to open ChainStore");
    (temp_dir, store)
}
