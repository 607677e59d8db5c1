use crate::{Change, TrackedMap, TrieError, TrieMap};

#[test]
fn records_single_add() {
    let view = TrackedMap::new(TrieMap::new()).add_or_update("k", 1);
    assert!(view.has_changes());
    let (map, log) = view.into_parts();
    assert_eq!(map.get(&"k"), Some(&1));
    assert_eq!(log.get(&"k"), Some(&Change::Added(1)));
}

#[test]
fn add_then_remove_nets_out() {
    let view = TrackedMap::new(TrieMap::new())
        .add_or_update("k", 1)
        .remove(&"k");
    assert!(!view.has_changes());
    let (map, log) = view.into_parts();
    assert!(map.is_empty());
    assert!(log.is_empty());
}

#[test]
fn add_then_update_stays_added() {
    let view = TrackedMap::new(TrieMap::new())
        .add_or_update("k", 1)
        .add_or_update("k", 2);
    let (_, log) = view.into_parts();
    assert_eq!(log.get(&"k"), Some(&Change::Added(2)));
}

#[test]
fn remove_then_readd_equal_nets_out() {
    let base = TrieMap::new().add_or_update("k", 7);
    let view = TrackedMap::new(base)
        .remove(&"k")
        .add_or_update("k", 7);
    assert!(!view.has_changes());
}

#[test]
fn remove_then_readd_different_is_update() {
    let base = TrieMap::new().add_or_update("k", 7);
    let view = TrackedMap::new(base)
        .remove(&"k")
        .add_or_update("k", 8);
    let (_, log) = view.into_parts();
    assert_eq!(log.get(&"k"), Some(&Change::Updated { old: 7, new: 8 }));
}

#[test]
fn strict_ops_propagate_errors() {
    let base = TrieMap::new().add_or_update("k", 1);
    let err = TrackedMap::new(base.clone()).add("k", 2).unwrap_err();
    assert_eq!(err, TrieError::DuplicateKey);

    let err = TrackedMap::new(base).set_item("zz", 2).unwrap_err();
    assert_eq!(err, TrieError::KeyNotFound);
}

#[test]
fn clear_records_every_key() {
    let base: TrieMap<u32, u32> = (0..4).map(|i| (i, i * 10)).collect();
    let view = TrackedMap::new(base).clear();
    let (map, log) = view.into_parts();

    assert!(map.is_empty());
    assert_eq!(log.len(), 4);
    assert_eq!(log.get(&2), Some(&Change::Removed(20)));
}

#[test]
fn equal_value_write_is_not_a_change() {
    let base = TrieMap::new().add_or_update("k", 1);
    let view = TrackedMap::new(base).add_or_update("k", 1);
    assert!(!view.has_changes());
}

#[test]
fn reads_see_pending_state() {
    let view = TrackedMap::new(TrieMap::new()).add_or_update("k", 1);
    assert_eq!(view.get(&"k"), Some(&1));
    assert!(view.contains_key(&"k"));
    assert_eq!(view.len(), 1);
    assert!(!view.is_empty());
}

#[test]
fn multiple_keys_log_independently() {
    let base = TrieMap::new().add_or_update("a", 1).add_or_update("b", 2);
    let view = TrackedMap::new(base)
        .add_or_update("a", 10)
        .remove(&"b")
        .add_or_update("c", 3);
    let (map, log) = view.into_parts();

    assert_eq!(map.len(), 2);
    assert_eq!(log.len(), 3);
    assert_eq!(log.get(&"a"), Some(&Change::Updated { old: 1, new: 10 }));
    assert_eq!(log.get(&"b"), Some(&Change::Removed(2)));
    assert_eq!(log.get(&"c"), Some(&Change::Added(3)));
}
