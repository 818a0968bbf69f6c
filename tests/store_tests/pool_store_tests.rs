//! Tests for PoolStore
//!
//! These tests verify:
//! - Opening/creating the data directory and manifest
//! - Create-then-extend append semantics
//! - Truncation of stored values
//! - Deletion and not-found signaling
//! - Persistence across reopen
//! - Concurrent access to the same and to different pools

use std::sync::Arc;
use std::thread;

use rankpool::config::SyncStrategy;
use rankpool::store::{AppendKind, DeleteResult, PoolStore, StoreManifest, FORMAT_VERSION};
use rankpool::{PoolError, PoolId};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PoolStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    (temp_dir, store)
}

fn id(raw: u64) -> PoolId {
    PoolId::new(raw).unwrap()
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_directories_and_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("pooldata");

    let store = PoolStore::open(&data_dir, SyncStrategy::EveryWrite).unwrap();

    assert!(data_dir.join("pools").is_dir());
    assert!(data_dir.join(StoreManifest::FILENAME).is_file());
    assert_eq!(store.manifest().format_version, FORMAT_VERSION);
    assert_eq!(store.pool_count(), 0);
}

#[test]
fn test_open_keeps_existing_manifest() {
    let temp_dir = TempDir::new().unwrap();

    let created_at = {
        let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
        store.manifest().created_at_ms
    };

    let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    assert_eq!(store.manifest().created_at_ms, created_at);
}

#[test]
fn test_open_rejects_unknown_format_version() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = StoreManifest {
        format_version: FORMAT_VERSION + 7,
        created_at_ms: 0,
    };
    std::fs::write(
        temp_dir.path().join(StoreManifest::FILENAME),
        bincode::serialize(&manifest).unwrap(),
    )
    .unwrap();

    let result = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite);

    assert!(matches!(result, Err(PoolError::Storage(_))));
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_creates_then_extends() {
    let (_temp, store) = setup_temp_store();

    assert!(!store.exists(id(1)));
    assert_eq!(store.append(id(1), &[1.0, 7.0, 2.0, 6.0]).unwrap(), AppendKind::Created);
    assert!(store.exists(id(1)));
    assert_eq!(store.append(id(1), &[3.0]).unwrap(), AppendKind::Extended);

    assert_eq!(store.read_all(id(1)).unwrap(), vec![1, 7, 2, 6, 3]);
    assert_eq!(store.len(id(1)), Some(5));
}

#[test]
fn test_append_truncates_toward_zero() {
    let (_temp, store) = setup_temp_store();

    store.append(id(9), &[-1.2, 32.0, -52.0, 100.0, 282.0, 2.9, -0.5]).unwrap();

    assert_eq!(store.read_all(id(9)).unwrap(), vec![-1, 32, -52, 100, 282, 2, 0]);
}

#[test]
fn test_append_empty_is_invalid() {
    let (_temp, store) = setup_temp_store();

    assert!(matches!(store.append(id(3), &[]), Err(PoolError::InvalidInput(_))));
    assert!(!store.exists(id(3)));

    store.append(id(3), &[1.0]).unwrap();
    assert!(matches!(store.append(id(3), &[]), Err(PoolError::InvalidInput(_))));
    assert_eq!(store.read_all(id(3)).unwrap(), vec![1]);
}

#[test]
fn test_append_rejects_non_finite_batch_atomically() {
    let (_temp, store) = setup_temp_store();

    let result = store.append(id(4), &[1.0, f64::NAN, 3.0]);
    assert!(matches!(result, Err(PoolError::InvalidInput(_))));
    assert!(!store.exists(id(4)));

    store.append(id(4), &[1.0]).unwrap();
    assert!(store.append(id(4), &[2.0, f64::INFINITY]).is_err());
    assert_eq!(store.read_all(id(4)).unwrap(), vec![1]);
}

#[test]
fn test_pools_are_independent() {
    let (_temp, store) = setup_temp_store();

    store.append(id(1), &[1.0, 2.0]).unwrap();
    store.append(id(2), &[10.0]).unwrap();
    store.append(id(1), &[3.0]).unwrap();

    assert_eq!(store.read_all(id(1)).unwrap(), vec![1, 2, 3]);
    assert_eq!(store.read_all(id(2)).unwrap(), vec![10]);
    assert_eq!(store.pool_ids(), vec![id(1), id(2)]);
}

// =============================================================================
// Read/Delete Tests
// =============================================================================

#[test]
fn test_read_all_missing_pool() {
    let (_temp, store) = setup_temp_store();

    match store.read_all(id(77)) {
        Err(PoolError::PoolNotFound(missing)) => assert_eq!(missing, id(77)),
        other => panic!("Expected PoolNotFound, got {:?}", other),
    }
    assert_eq!(store.len(id(77)), None);
}

#[test]
fn test_delete_then_not_found() {
    let (_temp, store) = setup_temp_store();

    store.append(id(5), &[1.0, 2.0]).unwrap();
    let file = store.pools_dir().join("pool_5.pool");
    assert!(file.exists());

    assert_eq!(store.delete(id(5)).unwrap(), DeleteResult::Deleted);
    assert!(!file.exists());
    assert!(!store.exists(id(5)));
    assert!(matches!(store.read_all(id(5)), Err(PoolError::PoolNotFound(_))));

    assert_eq!(store.delete(id(5)).unwrap(), DeleteResult::NotFound);
}

#[test]
fn test_delete_never_created() {
    let (_temp, store) = setup_temp_store();

    assert_eq!(store.delete(id(12)).unwrap(), DeleteResult::NotFound);
}

#[test]
fn test_recreate_after_delete_starts_empty() {
    let (_temp, store) = setup_temp_store();

    store.append(id(6), &[1.0, 2.0, 3.0]).unwrap();
    store.delete(id(6)).unwrap();

    assert_eq!(store.append(id(6), &[9.0]).unwrap(), AppendKind::Created);
    assert_eq!(store.read_all(id(6)).unwrap(), vec![9]);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_preserves_pools() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryNAppends { count: 100 })
            .unwrap();
        store.append(id(1), &[5.0, 4.0]).unwrap();
        store.append(id(1), &[3.0]).unwrap();
        store.append(id(20), &[-8.9]).unwrap();
        store.append(id(3), &[0.0]).unwrap();
        store.delete(id(3)).unwrap();
        store.close().unwrap();
    }

    let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();

    assert_eq!(store.pool_ids(), vec![id(1), id(20)]);
    assert_eq!(store.read_all(id(1)).unwrap(), vec![5, 4, 3]);
    assert_eq!(store.read_all(id(20)).unwrap(), vec![-8]);
    assert_eq!(store.append(id(1), &[2.0]).unwrap(), AppendKind::Extended);
    assert_eq!(store.read_all(id(1)).unwrap(), vec![5, 4, 3, 2]);
}

#[test]
fn test_reopen_without_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
        store.append(id(2), &[1.0, 2.0, 3.0]).unwrap();
        // Dropped without close()
    }

    let store = PoolStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    assert_eq!(store.read_all(id(2)).unwrap(), vec![1, 2, 3]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_appends_same_pool() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut created = 0;
                for i in 0..50 {
                    let base = (t * 1000 + i * 2) as f64;
                    if store.append(id(1), &[base, base + 1.0]).unwrap() == AppendKind::Created {
                        created += 1;
                    }
                }
                created
            })
        })
        .collect();

    let created: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(created, 1);

    let mut values = store.read_all(id(1)).unwrap();
    assert_eq!(values.len(), 8 * 50 * 2);

    // Each batch stays contiguous
    for pair in values.chunks(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }

    values.sort();
    values.dedup();
    assert_eq!(values.len(), 8 * 50 * 2);
}

#[test]
fn test_concurrent_different_pools() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (1..=8u64)
        .map(|pool| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..20 {
                    store.append(id(pool), &[i as f64]).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.pool_count(), 8);
    for pool in 1..=8u64 {
        assert_eq!(store.read_all(id(pool)).unwrap(), (0..20).collect::<Vec<i64>>());
    }
}

#[test]
fn test_concurrent_append_and_delete_stay_consistent() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let appenders: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    store.append(id(42), &[i as f64]).unwrap();
                }
            })
        })
        .collect();

    let deleter = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..100 {
                let _ = store.delete(id(42)).unwrap();
                thread::yield_now();
            }
        })
    };

    for h in appenders {
        h.join().unwrap();
    }
    deleter.join().unwrap();

    let file = store.pools_dir().join("pool_42.pool");
    assert_eq!(store.exists(id(42)), file.exists());
    if store.exists(id(42)) {
        let len = store.read_all(id(42)).unwrap().len() as u64;
        assert_eq!(store.len(id(42)), Some(len));
    }

    // No stray temporary files
    let leftovers = std::fs::read_dir(store.pools_dir())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map(|ext| ext == "tmp")
                .unwrap_or(false)
        })
        .count();
    assert_eq!(leftovers, 0);
}
