use std::hash::{Hash, Hasher};

use crate::{TrieError, TrieMap};

/// A key type with a controllable hash value for forcing collisions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollidingKey {
    id: u32,
    forced_hash: u64,
}

impl CollidingKey {
    const fn new(id: u32, hash: u64) -> Self {
        Self {
            id,
            forced_hash: hash,
        }
    }
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.forced_hash.hash(state);
    }
}

/// Two keys with the same hash traverse every trie level and land in a
/// collision node.
#[test]
fn two_colliding_keys() {
    let k1 = CollidingKey::new(1, 0xDEAD_BEEF);
    let k2 = CollidingKey::new(2, 0xDEAD_BEEF);

    let map = TrieMap::new()
        .add_or_update(k1.clone(), "first")
        .add_or_update(k2.clone(), "second");

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&"first"));
    assert_eq!(map.get(&k2), Some(&"second"));
}

#[test]
fn many_colliding_keys() {
    let keys: Vec<CollidingKey> = (0..8).map(|i| CollidingKey::new(i, 0xCAFE)).collect();

    let mut map = TrieMap::new();
    for (i, k) in keys.iter().enumerate() {
        map = map.add_or_update(k.clone(), i);
    }

    assert_eq!(map.len(), 8);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(map.get(k), Some(&i));
    }
}

#[test]
fn overwrite_in_collision() {
    let k1 = CollidingKey::new(1, 0xBBBB);
    let k2 = CollidingKey::new(2, 0xBBBB);

    let map = TrieMap::new()
        .add_or_update(k1.clone(), "old")
        .add_or_update(k2.clone(), "val2")
        .add_or_update(k1.clone(), "new");

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&"new"));
}

#[test]
fn remove_from_collision() {
    let k1 = CollidingKey::new(1, 0xAAAA);
    let k2 = CollidingKey::new(2, 0xAAAA);
    let k3 = CollidingKey::new(3, 0xAAAA);

    let map = TrieMap::new()
        .add_or_update(k1.clone(), 10)
        .add_or_update(k2.clone(), 20)
        .add_or_update(k3.clone(), 30);

    let map = map.remove(&k2);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&k1), Some(&10));
    assert_eq!(map.get(&k2), None);
    assert_eq!(map.get(&k3), Some(&30));
}

/// Shrinking a collision node to one entry promotes it back to a normal
/// inline entry; lookups keep working and removal reaches empty.
#[test]
fn collision_remove_all() {
    let keys: Vec<CollidingKey> = (0..4).map(|i| CollidingKey::new(i, 0xCCCC)).collect();

    let mut map = TrieMap::new();
    for k in &keys {
        map = map.add_or_update(k.clone(), k.id);
    }
    for (removed, k) in keys.iter().enumerate() {
        map = map.remove(k);
        assert_eq!(map.len(), keys.len() - removed - 1);
        for survivor in &keys[removed + 1..] {
            assert_eq!(map.get(survivor), Some(&survivor.id));
        }
    }
    assert!(map.is_empty());
    assert_eq!(map.adhash(), 0);
}

#[test]
fn update_kinds_inside_collision() {
    let k1 = CollidingKey::new(1, 0x1234);
    let k2 = CollidingKey::new(2, 0x1234);
    let k3 = CollidingKey::new(3, 0x1234);

    let map = TrieMap::new()
        .add_or_update(k1.clone(), 1)
        .add_or_update(k2.clone(), 2);

    assert_eq!(
        map.add(k1.clone(), 9).unwrap_err(),
        TrieError::DuplicateKey
    );
    assert_eq!(map.try_add(k1.clone(), 9), map);
    assert_eq!(
        map.set_item(k3.clone(), 9).unwrap_err(),
        TrieError::KeyNotFound
    );
    assert_eq!(map.try_set_item(k3.clone(), 9), map);
    assert_eq!(map.set_item(k2.clone(), 9).unwrap().get(&k2), Some(&9));
    assert_eq!(map.add(k3.clone(), 3).unwrap().len(), 3);
}

#[test]
fn mixed_collisions_and_normal() {
    let collide_a = CollidingKey::new(1, 0xDDDD);
    let collide_b = CollidingKey::new(2, 0xDDDD);
    let normal = CollidingKey::new(3, 0xEEEE);

    let map = TrieMap::new()
        .add_or_update(collide_a.clone(), "a")
        .add_or_update(collide_b.clone(), "b")
        .add_or_update(normal.clone(), "c");

    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&collide_a), Some(&"a"));
    assert_eq!(map.get(&collide_b), Some(&"b"));
    assert_eq!(map.get(&normal), Some(&"c"));
}

#[test]
fn colliding_maps_compare_equal_across_insert_orders() {
    let k1 = CollidingKey::new(1, 0x7777);
    let k2 = CollidingKey::new(2, 0x7777);

    let m1 = TrieMap::new()
        .add_or_update(k1.clone(), 1)
        .add_or_update(k2.clone(), 2);
    let m2 = TrieMap::new()
        .add_or_update(k2, 2)
        .add_or_update(k1, 1);

    assert_eq!(m1.adhash(), m2.adhash());
    assert_eq!(m1, m2);
}
