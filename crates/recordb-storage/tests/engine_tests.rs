//! Compliance tests for substrate implementations.
//!
//! These tests validate the trait contracts and can be run against any
//! storage engine implementation.

use std::ops::Bound;

use recordb_storage::{Cursor, RangeOptions, StorageEngine, StorageError, StorageResult, Transaction};

/// A test harness trait for testing storage engine implementations.
pub trait TestHarness {
    /// The storage engine type being tested.
    type Engine: StorageEngine;

    /// Create a new, empty storage engine for testing.
    fn create_engine() -> StorageResult<Self::Engine>;

    /// Clean up after tests (remove temp files, etc.).
    fn cleanup(_engine: Self::Engine) {}
}

/// Run the standard test suite against a storage engine.
pub fn run_test_suite<H: TestHarness>() {
    test_basic_operations::<H>();
    test_transaction_isolation::<H>();
    test_read_your_writes::<H>();
    test_range_scan::<H>();
    test_reverse_and_limit::<H>();
    test_clear_range::<H>();
    test_rollback_discards::<H>();
    test_read_only_enforcement::<H>();
}

fn collect<C: Cursor>(mut cursor: C) -> Vec<(Vec<u8>, Vec<u8>)> {
    cursor.collect_remaining().expect("failed to iterate")
}

fn keys<C: Cursor>(cursor: C) -> Vec<Vec<u8>> {
    collect(cursor).into_iter().map(|(k, _)| k).collect()
}

fn seed<E: StorageEngine>(engine: &E, count: u8) {
    let mut tx = engine.begin_write().expect("failed to begin write");
    for i in 0..count {
        tx.put(&[i], &[i * 10]).expect("failed to put");
    }
    tx.commit().expect("failed to commit");
}

/// Test basic get/put/clear operations.
fn test_basic_operations<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put(b"key1", b"value1").expect("failed to put");
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get(b"key1").expect("failed to get"), Some(b"value1".to_vec()));
        assert_eq!(tx.get(b"missing").expect("failed to get"), None);
    }

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put(b"key1", b"value1_updated").expect("failed to put");
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get(b"key1").expect("failed to get"), Some(b"value1_updated".to_vec()));
    }

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.clear(b"key1").expect("failed to clear");
        tx.clear(b"nonexistent").expect("clearing an absent key should succeed");
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get(b"key1").expect("failed to get"), None);
    }

    H::cleanup(engine);
}

/// A read transaction keeps its snapshot while a writer commits.
fn test_transaction_isolation<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put(b"key1", b"initial").expect("failed to put");
        tx.commit().expect("failed to commit");
    }

    {
        let read_tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(read_tx.get(b"key1").expect("failed to get"), Some(b"initial".to_vec()));
    }

    {
        let mut write_tx = engine.begin_write().expect("failed to begin write");
        write_tx.put(b"key1", b"updated").expect("failed to put");
        write_tx.commit().expect("failed to commit");
    }

    {
        let read_tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(read_tx.get(b"key1").expect("failed to get"), Some(b"updated".to_vec()));
    }

    H::cleanup(engine);
}

/// Staged writes are visible to the transaction that made them.
fn test_read_your_writes<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    seed(&engine, 3);

    let mut tx = engine.begin_write().expect("failed to begin write");
    tx.put(&[1], b"staged").expect("failed to put");
    tx.clear(&[2]).expect("failed to clear");
    tx.put(&[5], b"new").expect("failed to put");

    assert_eq!(tx.get(&[1]).expect("failed to get"), Some(b"staged".to_vec()));
    assert_eq!(tx.get(&[2]).expect("failed to get"), None);

    let pairs = collect(tx.range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new()).expect("range"));
    assert_eq!(
        pairs,
        vec![(vec![0], vec![0]), (vec![1], b"staged".to_vec()), (vec![5], b"new".to_vec())]
    );
    tx.rollback().expect("failed to rollback");

    H::cleanup(engine);
}

/// Test range scan bounds.
fn test_range_scan<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    {
        seed(&engine, 10);

        let tx = engine.begin_read().expect("failed to begin read");

        let cursor = tx
            .range(Bound::Included(&[3u8] as &[u8]), Bound::Excluded(&[7u8] as &[u8]), RangeOptions::new())
            .expect("failed to create range cursor");
        let results: Vec<_> = collect(cursor).into_iter().map(|(k, v)| (k[0], v[0])).collect();
        assert_eq!(results, vec![(3, 30), (4, 40), (5, 50), (6, 60)]);

        let cursor = tx
            .range(Bound::Excluded(&[3u8] as &[u8]), Bound::Included(&[5u8] as &[u8]), RangeOptions::new())
            .expect("failed to create range cursor");
        assert_eq!(keys(cursor), vec![vec![4], vec![5]]);

        let cursor = tx
            .range(Bound::Included(&[8u8] as &[u8]), Bound::Unbounded, RangeOptions::new())
            .expect("failed to create range cursor");
        assert_eq!(keys(cursor), vec![vec![8], vec![9]]);

        let cursor = tx
            .range(Bound::Included(&[7u8] as &[u8]), Bound::Excluded(&[3u8] as &[u8]), RangeOptions::new())
            .expect("failed to create range cursor");
        assert!(keys(cursor).is_empty());
    }

    H::cleanup(engine);
}

/// Reverse iteration and limits.
fn test_reverse_and_limit<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    {
        seed(&engine, 10);

        let tx = engine.begin_read().expect("failed to begin read");

        let cursor = tx
            .range(
                Bound::Included(&[2u8] as &[u8]),
                Bound::Excluded(&[6u8] as &[u8]),
                RangeOptions::new().reverse(true),
            )
            .expect("failed to create range cursor");
        assert_eq!(keys(cursor), vec![vec![5], vec![4], vec![3], vec![2]]);

        let cursor = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new().limit(3))
            .expect("failed to create range cursor");
        assert_eq!(keys(cursor), vec![vec![0], vec![1], vec![2]]);

        let cursor = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new().reverse(true).limit(2))
            .expect("failed to create range cursor");
        assert_eq!(keys(cursor), vec![vec![9], vec![8]]);

        let mut cursor = tx
            .range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new().limit(0))
            .expect("failed to create range cursor");
        assert_eq!(cursor.next().expect("failed to next"), None);
    }

    H::cleanup(engine);
}

/// `clear_range` removes `[start, end)` only.
fn test_clear_range<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    {
        seed(&engine, 10);

        {
            let mut tx = engine.begin_write().expect("failed to begin write");
            tx.clear_range(&[2], &[5]).expect("failed to clear range");
            tx.commit().expect("failed to commit");
        }

        let tx = engine.begin_read().expect("failed to begin read");
        let remaining = keys(tx.range(Bound::Unbounded, Bound::Unbounded, RangeOptions::new()).expect("range"));
        assert_eq!(remaining, vec![vec![0], vec![1], vec![5], vec![6], vec![7], vec![8], vec![9]]);
    }

    H::cleanup(engine);
}

/// Rolled back and dropped transactions leave no trace.
fn test_rollback_discards<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    {
        {
            let mut tx = engine.begin_write().expect("failed to begin write");
            tx.put(b"ghost", b"1").expect("failed to put");
            tx.rollback().expect("failed to rollback");
        }
        {
            let mut tx = engine.begin_write().expect("failed to begin write");
            tx.put(b"ghost", b"2").expect("failed to put");
        }

        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get(b"ghost").expect("failed to get"), None);
    }

    H::cleanup(engine);
}

/// Test that read-only transactions reject writes.
fn test_read_only_enforcement<H: TestHarness>() {
    let engine = H::create_engine().expect("failed to create engine");
    {
        let mut tx = engine.begin_read().expect("failed to begin read");
        assert!(tx.is_read_only());
        assert!(matches!(tx.put(b"key", b"value"), Err(StorageError::ReadOnly)));
        assert!(matches!(tx.clear(b"key"), Err(StorageError::ReadOnly)));
        assert!(matches!(tx.clear_range(b"a", b"b"), Err(StorageError::ReadOnly)));

        let tx = engine.begin_write().expect("failed to begin write");
        assert!(!tx.is_read_only());
    }

    H::cleanup(engine);
}
