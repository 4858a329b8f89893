//! Integration tests for index mutation and lookup.

use percolate_index::{
    IndexError, IndexMutator, IndexState, IndexValue, PropertyUpdate, StorageOptions, UpdateMode,
};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn open_index(index_id: u64) -> (TempDir, IndexMutator) {
    let dir = tempdir().unwrap();
    let mutator = IndexMutator::open(
        index_id,
        dir.path().join(format!("index-{}", index_id)),
        &StorageOptions::default(),
    )
    .unwrap();
    (dir, mutator)
}

fn value(s: &str) -> IndexValue {
    IndexValue::from(s)
}

#[test]
fn test_changed_moves_entity_between_values() {
    let (_dir, index) = open_index(7);

    index
        .apply_updates([
            PropertyUpdate::added(1, "x"),
            PropertyUpdate::added(2, "x"),
            PropertyUpdate::changed(1, "x", "y"),
        ])
        .unwrap();

    let reader = index.new_reader();
    assert_eq!(reader.lookup(&value("x")).unwrap(), vec![2]);
    assert_eq!(reader.lookup(&value("y")).unwrap(), vec![1]);
}

#[test]
fn test_reader_snapshot_isolation() {
    let (_dir, index) = open_index(1);
    index.apply_updates([PropertyUpdate::added(1, "v")]).unwrap();

    let before = index.new_reader();
    index.apply_updates([PropertyUpdate::added(2, "v")]).unwrap();
    let after = index.new_reader();

    assert_eq!(before.lookup(&value("v")).unwrap(), vec![1]);
    assert_eq!(after.lookup(&value("v")).unwrap(), vec![1, 2]);
}

#[test]
fn test_reader_ignores_uncommitted_adds() {
    let (_dir, index) = open_index(1);

    index.add(5, &value("e")).unwrap();
    let r1 = index.new_reader();
    index.force_flush().unwrap();
    let r2 = index.new_reader();

    assert!(r1.lookup(&value("e")).unwrap().is_empty());
    assert_eq!(r2.lookup(&value("e")).unwrap(), vec![5]);
}

#[test]
fn test_drop_index_then_fresh_reader_is_empty() {
    let (_dir, index) = open_index(2);
    index
        .apply_updates([PropertyUpdate::added(1, "a"), PropertyUpdate::added(2, "b")])
        .unwrap();

    index.drop_index().unwrap();

    let reader = index.new_reader();
    assert!(reader.lookup(&value("a")).unwrap().is_empty());
    assert!(reader.lookup(&value("b")).unwrap().is_empty());
    assert_eq!(index.entry_count().unwrap(), 0);
}

#[test]
fn test_remove_absent_value_creates_nothing() {
    let (_dir, index) = open_index(3);

    index.apply_updates([PropertyUpdate::removed(5, "z")]).unwrap();

    assert!(index.new_reader().lookup(&value("z")).unwrap().is_empty());
    assert_eq!(index.entry_count().unwrap(), 0);
}

#[test]
fn test_recover_replay_is_idempotent() {
    let (_dir, index) = open_index(4);
    let stream = vec![
        PropertyUpdate::added(1, "x"),
        PropertyUpdate::added(2, "x"),
        PropertyUpdate::added(3, 9i64),
        PropertyUpdate::changed(1, "x", "y"),
        PropertyUpdate::removed(3, 9i64),
    ];

    index.apply_updates(&stream).unwrap();
    let first = index.entries().unwrap();

    assert_eq!(index.recover(&stream).unwrap(), stream.len());
    assert_eq!(index.entries().unwrap(), first);
    assert_eq!(first.len(), 2);
    assert!(first.contains(&(value("x"), vec![2])));
    assert!(first.contains(&(value("y"), vec![1])));
}

#[test]
fn test_malformed_update_commits_nothing() {
    let (_dir, index) = open_index(5);
    index.apply_updates([PropertyUpdate::added(1, "keep")]).unwrap();

    let malformed = PropertyUpdate {
        entity_id: 9,
        mode: UpdateMode::Removed,
        value_before: None,
        value_after: Some(value("q")),
    };
    let err = index
        .apply_updates([
            PropertyUpdate::added(2, "keep"),
            PropertyUpdate::added(3, "new"),
            malformed,
        ])
        .unwrap_err();

    assert!(matches!(err, IndexError::UnsupportedUpdateKind(_)));
    let reader = index.new_reader();
    assert_eq!(reader.lookup(&value("keep")).unwrap(), vec![1]);
    assert!(reader.lookup(&value("new")).unwrap().is_empty());
    assert_eq!(index.pending_writes(), 0);
}

#[test]
fn test_posting_order_preserved_on_remove() {
    let (_dir, index) = open_index(6);

    index
        .apply_updates((1..=5).map(|id| PropertyUpdate::added(id, "same")))
        .unwrap();
    index.apply_updates([PropertyUpdate::removed(3, "same")]).unwrap();

    assert_eq!(
        index.new_reader().lookup(&value("same")).unwrap(),
        vec![1, 2, 4, 5]
    );
}

#[test]
fn test_first_entity_removed() {
    let (_dir, index) = open_index(6);

    index
        .apply_updates([PropertyUpdate::added(10, "f"), PropertyUpdate::added(11, "f")])
        .unwrap();
    index.apply_updates([PropertyUpdate::removed(10, "f")]).unwrap();

    assert_eq!(index.new_reader().lookup(&value("f")).unwrap(), vec![11]);
}

#[test]
fn test_value_types_are_distinct_keys() {
    let (_dir, index) = open_index(8);

    index
        .apply_updates([
            PropertyUpdate::added(1, 1i64),
            PropertyUpdate::added(2, 1.0f64),
            PropertyUpdate::added(3, "1"),
            PropertyUpdate::added(4, true),
            PropertyUpdate::added(5, vec![1u8]),
        ])
        .unwrap();

    let reader = index.new_reader();
    assert_eq!(reader.lookup(&IndexValue::Int(1)).unwrap(), vec![1]);
    assert_eq!(reader.lookup(&IndexValue::Float(1.0)).unwrap(), vec![2]);
    assert_eq!(reader.lookup(&value("1")).unwrap(), vec![3]);
    assert_eq!(reader.lookup(&IndexValue::Bool(true)).unwrap(), vec![4]);
    assert_eq!(reader.lookup(&IndexValue::Bytes(vec![1])).unwrap(), vec![5]);
    assert_eq!(index.entry_count().unwrap(), 5);
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index-9");
    let options = StorageOptions::default();

    {
        let index = IndexMutator::open(9, &path, &options).unwrap();
        assert_eq!(index.state(), IndexState::Populating);
        index.add(1, &value("p")).unwrap();
        index.complete_population(true).unwrap();
    }

    let index = IndexMutator::open(9, &path, &options).unwrap();
    assert_eq!(index.state(), IndexState::Online);
    assert_eq!(index.new_reader().lookup(&value("p")).unwrap(), vec![1]);
}

#[test]
fn test_concurrent_readers_with_writer() {
    let (_dir, index) = open_index(10);
    let index = Arc::new(index);
    index.apply_updates([PropertyUpdate::added(0, "c")]).unwrap();

    std::thread::scope(|s| {
        let writer = {
            let index = Arc::clone(&index);
            s.spawn(move || {
                for id in 1..=50u64 {
                    index.apply_updates([PropertyUpdate::added(id, "c")]).unwrap();
                }
            })
        };

        for _ in 0..4 {
            let index = Arc::clone(&index);
            s.spawn(move || {
                for _ in 0..50 {
                    let reader = index.new_reader();
                    let first = reader.lookup(&value("c")).unwrap();
                    let second = reader.lookup(&value("c")).unwrap();
                    assert_eq!(first, second);
                    assert_eq!(first[0], 0);
                    assert!(first.windows(2).all(|w| w[0] < w[1]));
                }
            });
        }

        writer.join().unwrap();
    });

    let all = index.new_reader().lookup(&value("c")).unwrap();
    assert_eq!(all, (0..=50).collect::<Vec<u64>>());
}

#[test]
fn test_online_reader_rejected_while_populating() {
    let (_dir, index) = open_index(11);
    index.apply_updates([PropertyUpdate::added(1, "x")]).unwrap();

    assert!(matches!(
        index.online_reader(),
        Err(IndexError::IndexNotOnline(11))
    ));
    assert_eq!(index.new_reader().lookup(&value("x")).unwrap(), vec![1]);

    index.complete_population(false).unwrap();
    assert!(index.online_reader().is_err());

    index.complete_population(true).unwrap();
    assert_eq!(index.online_reader().unwrap().lookup(&value("x")).unwrap(), vec![1]);
}

#[test]
fn test_open_failures_surface_as_storage_unavailable() {
    let dir = tempdir().unwrap();
    let options = StorageOptions::default();

    let file = dir.path().join("index-12");
    std::fs::write(&file, b"not a directory").unwrap();
    let err = IndexMutator::open(12, &file, &options).err().unwrap();
    assert!(matches!(err, IndexError::StorageUnavailable(_)));
    assert!(err.is_recoverable());

    let path = dir.path().join("index-13");
    let _open = IndexMutator::open(13, &path, &options).unwrap();
    assert!(matches!(
        IndexMutator::open(13, &path, &options),
        Err(IndexError::StorageUnavailable(_))
    ));
}
