mod helpers;

use blockvault_core::{Block, PowError, GENESIS_PAYLOAD};
use blockvault_storage::{ChainStore, StoreError};
use helpers::{create_temp_store, TEST_BITS};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn collect(store: &ChainStore) -> Vec<Block> {
    store
        .iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("walk chain")
}

#[test]
fn fresh_store_holds_only_genesis() {
    let (_tmp, store) = create_temp_store();
    let blocks = collect(&store);
    assert_eq!(blocks.len(), 1);
    let genesis = &blocks[0];
    assert!(genesis.is_genesis());
    assert_eq!(genesis.payload, GENESIS_PAYLOAD);
    assert_eq!(store.tip(), genesis.hash);
    assert!(genesis.verify());
}

#[test]
fn reopen_keeps_genesis_and_tip() {
    let tmp = tempdir().expect("temp dir");
    let tip = {
        let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("open");
        store.tip()
    };
    let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("reopen");
    assert_eq!(store.tip(), tip);
    assert_eq!(collect(&store).len(), 1);
}

#[test]
fn append_links_and_verifies() {
    let (_tmp, store) = create_temp_store();
    let genesis_hash = store.tip();
    let block = store.append(b"hello".to_vec()).expect("append");
    assert_eq!(store.tip(), block.hash);
    assert!(block.verify());

    let blocks = collect(&store);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].hash, block.hash);
    assert_eq!(blocks[0].prev_hash, genesis_hash.to_vec());
    assert_eq!(blocks[1].hash, genesis_hash);
    assert!(blocks.iter().all(Block::verify));
}

#[test]
fn appended_blocks_survive_reopen() {
    let tmp = tempdir().expect("temp dir");
    let hashes: Vec<_> = {
        let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("open");
        (0..3)
            .map(|i| {
                store
                    .append(format!("payload {i}").into_bytes())
                    .expect("append")
                    .hash
            })
            .collect()
    };
    let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("reopen");
    assert_eq!(store.tip(), hashes[2]);
    for hash in &hashes {
        let block = store.get(hash).expect("get");
        assert_eq!(block.hash, *hash);
        assert!(block.verify());
    }
}

#[test]
fn append_verifies_for_random_payloads() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let (_tmp, store) = create_temp_store();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..3 {
        let len = rng.gen_range(0..128);
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let block = store.append(payload.clone()).expect("append");
        assert_eq!(block.payload, payload);
        assert!(block.verify());
    }
}

#[test]
fn get_unknown_hash_is_not_found() {
    let (_tmp, store) = create_temp_store();
    let err = store.get(&[0xAB; 32]).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn iteration_is_newest_first_and_repeatable() {
    let (_tmp, store) = create_temp_store();
    store.append(b"one".to_vec()).expect("append");
    store.append(b"two".to_vec()).expect("append");

    let first = collect(&store);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].payload, b"two");
    assert_eq!(first[1].payload, b"one");
    assert!(first[2].is_genesis());

    // An exhausted iterator stays exhausted; a fresh one walks again.
    let mut iter = store.iter();
    while iter.next().is_some() {}
    assert!(iter.next().is_none());
    assert_eq!(collect(&store).len(), 3);
}

#[test]
fn exactly_one_genesis_after_appends() {
    let (_tmp, store) = create_temp_store();
    for i in 0..4 {
        store
            .append(format!("payload {i}").into_bytes())
            .expect("append");
    }
    let blocks = collect(&store);
    assert_eq!(blocks.iter().filter(|b| b.is_genesis()).count(), 1);
    assert!(blocks.last().expect("non-empty").is_genesis());
}

#[test]
fn concurrent_appends_serialize() {
    let (_tmp, store) = create_temp_store();
    let store = Arc::new(store);
    let n = 8;
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .append(format!("payload {i}").into_bytes())
                    .expect("append")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let blocks = collect(&store);
    assert_eq!(blocks.len(), n + 1);
    // Linear linkage: each block's predecessor is the next one yielded.
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].prev_hash, pair[1].hash.to_vec());
    }
    // No two blocks share a predecessor.
    let mut preds: Vec<_> = blocks
        .iter()
        .filter(|b| !b.is_genesis())
        .map(|b| b.prev_hash.clone())
        .collect();
    preds.sort();
    preds.dedup();
    assert_eq!(preds.len(), n);
}

#[test]
fn cancelled_append_leaves_store_untouched() {
    let (_tmp, store) = create_temp_store();
    let tip = store.tip();
    let cancel = AtomicBool::new(true);
    let err = store
        .append_with_cancel(b"never stored".to_vec(), &cancel)
        .unwrap_err();
    assert!(matches!(err, StoreError::Pow(PowError::Cancelled)));
    assert_eq!(store.tip(), tip);
    assert_eq!(collect(&store).len(), 1);
}

#[test]
fn corrupt_record_is_surfaced() {
    let tmp = tempdir().expect("temp dir");
    let hash = {
        let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("open");
        store.append(b"soon corrupt".to_vec()).expect("append").hash
    };
    // Clobber the record through raw sled while the store is closed.
    {
        let db = sled::open(tmp.path()).expect("raw open");
        let blocks = db.open_tree("blocks").expect("tree");
        blocks.insert(&hash[..], vec![0u8; 10]).expect("insert");
        db.flush().expect("flush");
    }
    let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("reopen");
    let err = store.get(&hash).unwrap_err();
    assert!(matches!(err, StoreError::CorruptRecord(_)));
}

#[test]
fn flipped_byte_is_detectable() {
    let tmp = tempdir().expect("temp dir");
    let hash = {
        let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("open");
        store.append(b"flip one byte".to_vec()).expect("append").hash
    };
    {
        let db = sled::open(tmp.path()).expect("raw open");
        let blocks = db.open_tree("blocks").expect("tree");
        let mut raw = blocks.get(&hash[..]).expect("get").expect("present").to_vec();
        let mid = raw.len() / 2;
        raw[mid] ^= 0x01;
        blocks.insert(&hash[..], raw).expect("insert");
        db.flush().expect("flush");
    }
    let store = ChainStore::open_with_difficulty(tmp.path(), TEST_BITS).expect("reopen");
    match store.get(&hash) {
        Err(StoreError::CorruptRecord(_)) => {}
        Ok(block) => assert!(!block.verify(), "tampered block must fail verification"),
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn blocks_mined_before_difficulty_change_still_verify() {
    let tmp = tempdir().expect("temp dir");
    {
        let store = ChainStore::open_with_difficulty(tmp.path(), 8).expect("open");
        store.append(b"mined at eight".to_vec()).expect("append");
    }
    let store = ChainStore::open_with_difficulty(tmp.path(), 9).expect("reopen");
    let newer = store.append(b"mined at nine".to_vec()).expect("append");
    assert_eq!(newer.difficulty_bits, 9);

    let blocks = collect(&store);
    assert!(blocks.iter().all(Block::verify));
    assert!(blocks.iter().any(|b| b.difficulty_bits == 8));
}
