//! Integration tests for the memory substrate.

mod engine_tests;

use std::ops::Bound;
use std::thread;
use std::time::Duration;

use engine_tests::{run_test_suite, TestHarness};
use recordb_storage::{
    Cursor, Fault, MemoryConfig, MemoryEngine, RangeOptions, StorageEngine, StorageError,
    StorageResult, Transaction,
};

struct MemoryHarness;

impl TestHarness for MemoryHarness {
    type Engine = MemoryEngine;

    fn create_engine() -> StorageResult<Self::Engine> {
        Ok(MemoryEngine::new())
    }
}

#[test]
fn test_memory_compliance() {
    run_test_suite::<MemoryHarness>();
}

fn put_committed(engine: &MemoryEngine, key: &[u8], value: &[u8]) {
    let mut tx = engine.begin_write().expect("failed to begin write");
    tx.put(key, value).expect("failed to put");
    tx.commit().expect("failed to commit");
}

// ============================================================================
// Conflict detection
// ============================================================================

#[test]
fn test_read_write_overlap_conflicts() {
    let engine = MemoryEngine::new();
    put_committed(&engine, b"k", b"0");

    let mut first = engine.begin_write().expect("failed to begin write");
    let mut second = engine.begin_write().expect("failed to begin write");

    assert_eq!(first.get(b"k").expect("failed to get"), Some(b"0".to_vec()));
    assert_eq!(second.get(b"k").expect("failed to get"), Some(b"0".to_vec()));

    first.put(b"k", b"1").expect("failed to put");
    second.put(b"k", b"2").expect("failed to put");

    first.commit().expect("first commit should succeed");
    let err = second.commit().expect_err("second commit should conflict");
    assert!(matches!(err, StorageError::Conflict(_)));
    assert!(err.is_retryable());

    let tx = engine.begin_read().expect("failed to begin read");
    assert_eq!(tx.get(b"k").expect("failed to get"), Some(b"1".to_vec()));
}

#[test]
fn test_range_read_conflicts_with_insert_into_range() {
    let engine = MemoryEngine::new();

    let mut scanner = engine.begin_write().expect("failed to begin write");
    let seen = scanner
        .range(Bound::Included(b"a".as_slice()), Bound::Excluded(b"m".as_slice()), RangeOptions::new())
        .expect("failed to create range cursor")
        .collect_remaining()
        .expect("failed to iterate");
    assert!(seen.is_empty());
    scanner.put(b"summary", b"0").expect("failed to put");

    put_committed(&engine, b"cat", b"x");

    let err = scanner.commit().expect_err("phantom insert should conflict");
    assert!(matches!(err, StorageError::Conflict(_)));
}

#[test]
fn test_cleared_range_conflicts_with_reader() {
    let engine = MemoryEngine::new();
    put_committed(&engine, b"b", b"1");

    let mut reader = engine.begin_write().expect("failed to begin write");
    reader.get(b"b").expect("failed to get");
    reader.put(b"z", b"1").expect("failed to put");

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.clear_range(b"a", b"c").expect("failed to clear range");
        tx.commit().expect("failed to commit");
    }

    assert!(matches!(reader.commit(), Err(StorageError::Conflict(_))));
}

#[test]
fn test_blind_writes_do_not_conflict() {
    let engine = MemoryEngine::new();

    let mut first = engine.begin_write().expect("failed to begin write");
    let mut second = engine.begin_write().expect("failed to begin write");
    first.put(b"k", b"1").expect("failed to put");
    second.put(b"k", b"2").expect("failed to put");

    first.commit().expect("first commit should succeed");
    second.commit().expect("blind write should not conflict");

    let tx = engine.begin_read().expect("failed to begin read");
    assert_eq!(tx.get(b"k").expect("failed to get"), Some(b"2".to_vec()));
}

#[test]
fn test_disjoint_reads_do_not_conflict() {
    let engine = MemoryEngine::new();

    let mut first = engine.begin_write().expect("failed to begin write");
    let mut second = engine.begin_write().expect("failed to begin write");
    first.get(b"a").expect("failed to get");
    second.get(b"b").expect("failed to get");
    first.put(b"a", b"1").expect("failed to put");
    second.put(b"b", b"2").expect("failed to put");

    first.commit().expect("failed to commit");
    second.commit().expect("disjoint transactions should both commit");
    assert_eq!(engine.len(), 2);
}

#[test]
fn test_read_of_own_write_is_not_a_conflict_range() {
    let engine = MemoryEngine::new();

    let mut first = engine.begin_write().expect("failed to begin write");
    first.put(b"k", b"mine").expect("failed to put");
    assert_eq!(first.get(b"k").expect("failed to get"), Some(b"mine".to_vec()));

    put_committed(&engine, b"k", b"theirs");

    first.commit().expect("reading a staged write records no conflict range");
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_snapshot_is_stable() {
    let engine = MemoryEngine::new();
    put_committed(&engine, b"k", b"old");

    let reader = engine.begin_read().expect("failed to begin read");
    put_committed(&engine, b"k", b"new");
    put_committed(&engine, b"other", b"x");

    assert_eq!(reader.get(b"k").expect("failed to get"), Some(b"old".to_vec()));
    assert_eq!(reader.get(b"other").expect("failed to get"), None);
    drop(reader);

    let fresh = engine.begin_read().expect("failed to begin read");
    assert_eq!(fresh.get(b"k").expect("failed to get"), Some(b"new".to_vec()));
}

#[test]
fn test_version_advances_only_on_writes() {
    let engine = MemoryEngine::new();
    assert_eq!(engine.version(), 0);

    let tx = engine.begin_write().expect("failed to begin write");
    tx.commit().expect("empty commit should succeed");
    assert_eq!(engine.version(), 0);

    put_committed(&engine, b"k", b"v");
    assert_eq!(engine.version(), 1);
    assert!(!engine.is_empty());
}

// ============================================================================
// Limits
// ============================================================================

#[test]
fn test_transaction_size_limit() {
    let engine = MemoryEngine::with_config(MemoryConfig::new().max_transaction_bytes(16));

    let mut tx = engine.begin_write().expect("failed to begin write");
    tx.put(b"key", &[0u8; 64]).expect("staging is not limited");
    let err = tx.commit().expect_err("oversized commit should fail");
    assert!(matches!(err, StorageError::LimitExceeded(_)));
    assert!(!err.is_retryable());
    assert!(engine.is_empty());
}

#[test]
fn test_transaction_timeout() {
    let engine =
        MemoryEngine::with_config(MemoryConfig::new().transaction_timeout(Duration::from_millis(20)));

    let mut tx = engine.begin_write().expect("failed to begin write");
    tx.put(b"k", b"v").expect("failed to put");
    thread::sleep(Duration::from_millis(50));

    assert!(matches!(tx.get(b"k"), Err(StorageError::LimitExceeded(_))));
    assert!(matches!(tx.commit(), Err(StorageError::LimitExceeded(_))));
    assert!(engine.is_empty());
}

// ============================================================================
// Fault injection
// ============================================================================

#[test]
fn test_injected_faults_fire_once_in_order() {
    let engine = MemoryEngine::new();
    engine.inject_fault(Fault::Unavailable);
    engine.inject_fault(Fault::Conflict);

    let attempt = |value: &[u8]| {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put(b"k", value).expect("failed to put");
        tx.commit()
    };

    assert!(matches!(attempt(b"1"), Err(StorageError::Unavailable(_))));
    assert!(matches!(attempt(b"2"), Err(StorageError::Conflict(_))));
    attempt(b"3").expect("faults are consumed");

    let tx = engine.begin_read().expect("failed to begin read");
    assert_eq!(tx.get(b"k").expect("failed to get"), Some(b"3".to_vec()));
}

#[test]
fn test_concurrent_counter_with_retries() {
    let engine = MemoryEngine::new();
    put_committed(&engine, b"counter", &0u64.to_be_bytes());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    loop {
                        let mut tx = engine.begin_write().expect("failed to begin write");
                        let current = tx.get(b"counter").expect("failed to get").expect("counter");
                        let mut buf = [0u8; 8];
                        buf.copy_from_slice(&current);
                        let next = u64::from_be_bytes(buf) + 1;
                        tx.put(b"counter", &next.to_be_bytes()).expect("failed to put");
                        match tx.commit() {
                            Ok(()) => break,
                            Err(e) if e.is_retryable() => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let tx = engine.begin_read().expect("failed to begin read");
    let value = tx.get(b"counter").expect("failed to get").expect("counter");
    assert_eq!(value, 100u64.to_be_bytes().to_vec());
}
