use crate::TrieMap;

/// Mutating a derived map never disturbs references to the original.
#[test]
fn original_survives_add() {
    let m1: TrieMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
    let m2 = m1.add_or_update(100, 100);

    assert_eq!(m1.len(), 100);
    assert_eq!(m1.get(&100), None);
    assert_eq!(m2.len(), 101);
    assert_eq!(m2.get(&100), Some(&100));
}

#[test]
fn original_survives_remove() {
    let m1: TrieMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
    let m2 = m1.remove(&0).remove(&50).remove(&99);

    assert_eq!(m1.len(), 100);
    for i in 0..100 {
        assert_eq!(m1.get(&i), Some(&i));
    }
    assert_eq!(m2.len(), 97);
}

#[test]
fn original_survives_overwrite() {
    let m1 = TrieMap::new().add_or_update("k", "old");
    let m2 = m1.add_or_update("k", "new");

    assert_eq!(m1.get(&"k"), Some(&"old"));
    assert_eq!(m2.get(&"k"), Some(&"new"));
}

/// `remove(add(m, k, v), k) == remove(m, k)` for `k` not in `m`.
#[test]
fn add_remove_round_trip() {
    let base: TrieMap<u32, u32> = (0..64).map(|i| (i, i)).collect();
    let round_tripped = base.add_or_update(1000, 1).remove(&1000);
    assert_eq!(round_tripped, base.remove(&1000));
    assert_eq!(round_tripped, base);
    assert_eq!(round_tripped.adhash(), base.adhash());
}

/// A long chain of derived snapshots all stay individually valid.
#[test]
fn snapshot_chain() {
    let mut snapshots = vec![TrieMap::new()];
    for i in 0_u32..64 {
        let next = snapshots.last().unwrap().add_or_update(i, i);
        snapshots.push(next);
    }

    for (generation, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.len(), generation);
        for i in 0..generation {
            let key = u32::try_from(i).unwrap();
            assert_eq!(snapshot.get(&key), Some(&key));
        }
    }
}

#[test]
fn clone_is_independent() {
    let m1: TrieMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    let m2 = m1.clone();
    let m3 = m2.remove(&5);

    assert_eq!(m1, m2);
    assert_eq!(m1.len(), 10);
    assert_eq!(m3.len(), 9);
}

/// Seeding a builder from a live map copies paths on first touch.
#[test]
fn builder_seeded_from_map_preserves_source() {
    let source: TrieMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
    let mut builder = source.to_builder();
    for i in 50..100 {
        builder.insert(i, i);
    }
    builder.insert(0, 999);
    let grown = builder.freeze();

    assert_eq!(source.len(), 50);
    assert_eq!(source.get(&0), Some(&0));
    assert_eq!(grown.len(), 100);
    assert_eq!(grown.get(&0), Some(&999));
    assert_eq!(grown.get(&75), Some(&75));
}
