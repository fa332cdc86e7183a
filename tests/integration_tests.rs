//! Integration tests for bitstore
//!
//! These tests verify:
//! - The storage::open factory builds and opens the configured backend
//! - Both backends agree on every read for the same writes
//! - End-to-end persistence through flush, close and reopen

use std::path::Path;

use bitstore::storage::{self, StorageBackend};
use bitstore::{pos, Config, Position, StorageKind, StoreError, SLICE_WIDTH};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_kind(path: &Path, kind: StorageKind) -> Box<dyn StorageBackend> {
    let config = Config::builder().kind(kind).build();
    storage::open(path, &config).unwrap()
}

fn all_bits(backend: &mut dyn StorageBackend) -> Vec<(u64, u64)> {
    let mut bits = Vec::new();
    backend
        .for_each_bit(&mut |row, column| {
            bits.push((row, column));
            Ok(())
        })
        .unwrap();
    bits
}

// =============================================================================
// Factory Tests
// =============================================================================

#[test]
fn test_open_file_kind() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("0");

    let mut backend = open_kind(&path, StorageKind::File);
    backend.add(Position::new(1, 2)).unwrap();

    assert_eq!(backend.path(), path.as_path());
    assert!(path.exists());
}

#[test]
fn test_open_paged_kind() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("0");

    let mut backend = open_kind(&path, StorageKind::Paged);
    backend.add(Position::new(1, 2)).unwrap();

    assert!(!path.exists());
    assert!(temp.path().join("0.0.page").exists());
}

#[test]
fn test_open_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().max_op_count(0).build();

    let result = storage::open(temp.path().join("0"), &config);

    assert!(matches!(result, Err(StoreError::Config(_))));
}

// =============================================================================
// Cross-Backend Tests
// =============================================================================

#[test]
fn test_backends_agree() {
    let temp = TempDir::new().unwrap();
    let mut file = open_kind(&temp.path().join("file"), StorageKind::File);
    let mut paged = open_kind(&temp.path().join("paged"), StorageKind::Paged);

    let writes = [
        (true, Position::new(0, 0)),
        (true, Position::new(5, 99)),
        (true, Position::new(5, 3)),
        (true, Position::new(2_000_000, 1)),
        (false, Position::new(5, 99)),
        (true, Position::new(42, SLICE_WIDTH - 1)),
    ];
    for (set, p) in writes {
        let (a, b) = if set {
            (file.add(p).unwrap(), paged.add(p).unwrap())
        } else {
            (file.remove(p).unwrap(), paged.remove(p).unwrap())
        };
        assert_eq!(a, b);
    }

    assert_eq!(all_bits(file.as_mut()), all_bits(paged.as_mut()));
    assert_eq!(file.max().unwrap(), paged.max().unwrap());
    assert_eq!(file.count(5).unwrap(), paged.count(5).unwrap());
    assert_eq!(file.row(5).unwrap(), paged.row(5).unwrap());
    assert_eq!(
        file.iterator().unwrap().collect::<Vec<_>>(),
        paged.iterator().unwrap().collect::<Vec<_>>()
    );
    assert_eq!(file.block_data(0).unwrap(), paged.block_data(0).unwrap());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_flush_close_reopen_scenario() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("3");
    let p = Position::new(3, 5);

    {
        let mut backend = open_kind(&path, StorageKind::File);
        backend.add(p).unwrap();
        backend.flush().unwrap();
        backend.close().unwrap();
    }

    let mut backend = open_kind(&path, StorageKind::File);
    assert!(backend.contains(p).unwrap());
    assert_eq!(backend.max().unwrap(), Some(pos(3, 5)));
}

#[test]
fn test_paged_reopen_sees_all_pages() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("frag");
    let rows = [1u64, 1 << 20, 5 << 20, 11 << 20];

    {
        let mut backend = open_kind(&path, StorageKind::Paged);
        for row in rows {
            backend.add(Position::new(row, 8)).unwrap();
        }
        backend.close().unwrap();
    }

    let mut backend = open_kind(&path, StorageKind::Paged);
    let seen: Vec<u64> = all_bits(backend.as_mut()).into_iter().map(|(row, _)| row).collect();
    assert_eq!(seen, rows.to_vec());
}

#[test]
fn test_many_compactions_preserve_data() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().max_op_count(10).build();
    let path = temp.path().join("busy");
    let mut backend = storage::open(&path, &config).unwrap();

    for column in 0..500 {
        backend.add(Position::new(column % 7, column)).unwrap();
    }
    for column in (0..500).step_by(5) {
        backend.remove(Position::new(column % 7, column)).unwrap();
    }
    backend.close().unwrap();

    let mut backend = storage::open(&path, &config).unwrap();
    let total: u64 = (0..7).map(|row| backend.count(row).unwrap()).sum();
    assert_eq!(total, 400);
}
