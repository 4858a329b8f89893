//! Integration tests for the index provider.

use percolate_index::{
    IndexError, IndexProvider, IndexState, IndexValue, PropertyUpdate, ProviderConfig,
};
use std::sync::Arc;
use tempfile::tempdir;

fn provider_at(root: &std::path::Path) -> IndexProvider {
    IndexProvider::new(ProviderConfig::new(root)).unwrap()
}

#[test]
fn test_populate_then_online_lookup() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let populator = provider.get_populator(7).unwrap();
    for id in [1, 2, 3] {
        populator.add(id, &IndexValue::from("blue")).unwrap();
    }
    assert!(matches!(
        provider.get_online_accessor(7),
        Err(IndexError::IndexNotOnline(7))
    ));

    populator.complete_population(true).unwrap();

    let accessor = provider.get_online_accessor(7).unwrap();
    accessor
        .update_and_commit([PropertyUpdate::changed(2, "blue", "red")])
        .unwrap();

    let reader = accessor.new_reader();
    assert_eq!(reader.lookup(&"blue".into()).unwrap(), vec![1, 3]);
    assert_eq!(reader.lookup(&"red".into()).unwrap(), vec![2]);
}

#[test]
fn test_failed_population_stays_populating() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let populator = provider.get_populator(1).unwrap();
    assert_eq!(
        populator.complete_population(false).unwrap(),
        IndexState::Populating
    );
    assert_eq!(provider.get_initial_state(1).unwrap(), IndexState::Populating);
    assert!(provider.get_online_accessor(1).is_err());
}

#[test]
fn test_initial_state_from_disk() {
    let dir = tempdir().unwrap();

    {
        let provider = provider_at(dir.path());
        assert_eq!(provider.get_initial_state(3).unwrap(), IndexState::Populating);

        let populator = provider.get_populator(3).unwrap();
        populator
            .apply_updates([PropertyUpdate::added(1, 42i64)])
            .unwrap();
        populator.complete_population(true).unwrap();
        drop(populator);
        provider.shutdown().unwrap();
    }

    let provider = provider_at(dir.path());
    assert_eq!(provider.get_initial_state(3).unwrap(), IndexState::Online);

    let accessor = provider.get_online_accessor(3).unwrap();
    assert_eq!(accessor.new_reader().lookup(&42i64.into()).unwrap(), vec![1]);
}

#[test]
fn test_online_accessor_opens_existing_directory() {
    let dir = tempdir().unwrap();

    {
        let provider = provider_at(dir.path());
        provider.get_populator(4).unwrap().complete_population(true).unwrap();
        provider.shutdown().unwrap();
    }

    let provider = provider_at(dir.path());
    assert!(provider.get_online_accessor(4).unwrap().is_online());
}

#[test]
fn test_drop_index_releases_directory() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    {
        let populator = provider.get_populator(2).unwrap();
        populator
            .apply_updates([PropertyUpdate::added(1, "a"), PropertyUpdate::added(2, "b")])
            .unwrap();
    }

    provider.drop_index(2).unwrap();

    assert!(!dir.path().join("index-2").exists());
    assert!(provider.list_indexes().unwrap().is_empty());
    assert_eq!(provider.get_initial_state(2).unwrap(), IndexState::Populating);

    let fresh = provider.get_populator(2).unwrap();
    assert_eq!(fresh.entry_count().unwrap(), 0);
    assert!(fresh.new_reader().lookup(&"a".into()).unwrap().is_empty());
}

#[test]
fn test_concurrent_get_populator_single_instance() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let handles: Vec<_> = std::thread::scope(|s| {
        (0..8)
            .map(|_| s.spawn(|| provider.get_populator(11).unwrap()))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect()
    });

    assert!(handles.iter().all(|m| Arc::ptr_eq(m, &handles[0])));
}

#[test]
fn test_shutdown_commits_pending_adds() {
    let dir = tempdir().unwrap();

    {
        let provider = provider_at(dir.path());
        let populator = provider.get_populator(6).unwrap();
        populator.add(8, &"late".into()).unwrap();
        provider.shutdown().unwrap();
        assert!(matches!(populator.close(), Err(IndexError::IndexClosed(6))));
    }

    let provider = provider_at(dir.path());
    let populator = provider.get_populator(6).unwrap();
    assert_eq!(populator.new_reader().lookup(&"late".into()).unwrap(), vec![8]);
}

#[test]
fn test_drop_closed_index_while_held_clears_entries() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let populator = provider.get_populator(5).unwrap();
    populator.add(1, &"a".into()).unwrap();
    populator.close().unwrap();
    assert_eq!(populator.entry_count().unwrap(), 1);

    provider.drop_index(5).unwrap();
    assert_eq!(populator.entry_count().unwrap(), 0);

    drop(populator);
    provider.shutdown().unwrap();
    drop(provider);

    let provider = provider_at(dir.path());
    let reopened = provider.get_populator(5).unwrap();
    assert_eq!(reopened.entry_count().unwrap(), 0);
    assert_eq!(reopened.state(), IndexState::Populating);
}

#[test]
fn test_recreate_after_drop_while_held() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let held = provider.get_populator(9).unwrap();
    held.apply_updates([PropertyUpdate::added(1, "old")]).unwrap();
    held.complete_population(true).unwrap();

    provider.drop_index(9).unwrap();

    let recreated = provider.get_populator(9).unwrap();
    assert_eq!(recreated.state(), IndexState::Populating);
    recreated
        .apply_updates([PropertyUpdate::added(2, "new")])
        .unwrap();
    recreated.complete_population(true).unwrap();

    let accessor = provider.get_online_accessor(9).unwrap();
    let ids = accessor.online_reader().unwrap().lookup(&"new".into()).unwrap();
    assert_eq!(ids, vec![2]);
    assert!(held.new_reader().lookup(&"old".into()).unwrap().is_empty());
}

#[test]
fn test_reopen_after_shutdown_while_held() {
    let dir = tempdir().unwrap();
    let provider = provider_at(dir.path());

    let held = provider.get_populator(12).unwrap();
    held.apply_updates([PropertyUpdate::added(1, "k")]).unwrap();
    provider.shutdown().unwrap();
    assert!(held.is_closed());

    let again = provider.get_populator(12).unwrap();
    assert!(!again.is_closed());
    assert_eq!(again.new_reader().lookup(&"k".into()).unwrap(), vec![1]);
}
