use crate::{TrieError, TrieMap};

#[test]
fn add_new_key() {
    let map = TrieMap::new().add("k", 1).unwrap();
    assert_eq!(map.get(&"k"), Some(&1));
}

#[test]
fn add_duplicate_errors() {
    let map = TrieMap::new().add("k", 1).unwrap();
    assert_eq!(map.add("k", 2).unwrap_err(), TrieError::DuplicateKey);
    // The receiver is untouched by the failed call.
    assert_eq!(map.get(&"k"), Some(&1));
}

#[test]
fn try_add_existing_is_noop() {
    let map = TrieMap::new().add_or_update("k", 1);
    let same = map.try_add("k", 2);
    assert_eq!(same.get(&"k"), Some(&1));
    assert_eq!(same, map);
}

/// `try_add(try_add(m, k, v), k, v2) == try_add(m, k, v)` for any `v2`.
#[test]
fn try_add_is_idempotent() {
    let base: TrieMap<&str, i32> = TrieMap::new();
    let once = base.try_add("k", 1);
    let twice = once.try_add("k", 999);
    assert_eq!(once, twice);
    assert_eq!(once.adhash(), twice.adhash());
}

#[test]
fn set_item_replaces_existing() {
    let map = TrieMap::new().add_or_update("k", 1);
    let map = map.set_item("k", 2).unwrap();
    assert_eq!(map.get(&"k"), Some(&2));
    assert_eq!(map.len(), 1);
}

#[test]
fn set_item_missing_errors() {
    let map = TrieMap::new().add_or_update("other", 1);
    assert_eq!(map.set_item("k", 2).unwrap_err(), TrieError::KeyNotFound);
}

#[test]
fn set_item_on_empty_errors() {
    let map: TrieMap<&str, i32> = TrieMap::new();
    assert_eq!(map.set_item("k", 1).unwrap_err(), TrieError::KeyNotFound);
}

#[test]
fn try_set_item_missing_is_noop() {
    let map = TrieMap::new().add_or_update("a", 1);
    let same = map.try_set_item("k", 2);
    assert_eq!(same, map);
    assert!(!same.contains_key(&"k"));
}

#[test]
fn try_set_item_existing_replaces() {
    let map = TrieMap::new().add_or_update("k", 1);
    let map = map.try_set_item("k", 2);
    assert_eq!(map.get(&"k"), Some(&2));
}

#[test]
fn add_or_update_with_uses_current_value() {
    let map = TrieMap::new().add_or_update("counter", 10);
    let bumped = map.add_or_update_with("counter", |v| v + 1, 0);
    assert_eq!(bumped.get(&"counter"), Some(&11));
}

#[test]
fn add_or_update_with_falls_back_to_default() {
    let map: TrieMap<&str, i32> = TrieMap::new();
    let map = map.add_or_update_with("counter", |v| v + 1, 0);
    assert_eq!(map.get(&"counter"), Some(&0));
}

#[test]
fn add_range_strict() {
    let map = TrieMap::new().add_range(vec![("a", 1), ("b", 2)]).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(
        map.add_range(vec![("c", 3), ("a", 9)]).unwrap_err(),
        TrieError::DuplicateKey
    );
}

#[test]
fn try_add_range_skips_existing() {
    let map = TrieMap::new().add_or_update("a", 1);
    let map = map.try_add_range(vec![("a", 9), ("b", 2)]);
    assert_eq!(map.get(&"a"), Some(&1));
    assert_eq!(map.get(&"b"), Some(&2));
}

#[test]
fn set_range_requires_all_keys() {
    let map = TrieMap::new().add_or_update("a", 1).add_or_update("b", 2);
    let updated = map.set_range(vec![("a", 10), ("b", 20)]).unwrap();
    assert_eq!(updated.get(&"a"), Some(&10));
    assert_eq!(
        map.set_range(vec![("a", 10), ("zz", 1)]).unwrap_err(),
        TrieError::KeyNotFound
    );
}

#[test]
fn remove_range_drops_all() {
    let map: TrieMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    let map = map.remove_range(0..5);
    assert_eq!(map.len(), 5);
    assert!(!map.contains_key(&0));
    assert!(map.contains_key(&7));
}

#[test]
fn error_display() {
    assert_eq!(
        TrieError::DuplicateKey.to_string(),
        "key already present in map"
    );
    assert_eq!(TrieError::KeyNotFound.to_string(), "key not found in map");
}
