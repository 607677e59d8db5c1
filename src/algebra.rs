//! Set algebra over [`TrieMap`]: union, intersect, except, symmetric except.

use std::hash::Hash;

use crate::TrieMapBuilder;
use crate::change::{self, Change};
use crate::map::TrieMap;

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// Union of both key sets. On conflict the receiver's value wins.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut map = self.clone();
        for (key, value) in other {
            map = map.try_add(key.clone(), value.clone());
        }
        map
    }

    /// Union of both key sets, reconciling conflicts with `merge`.
    #[must_use]
    pub fn union_with(&self, other: &Self, merge: impl Fn(&K, &V, &V) -> V) -> Self {
        let mut map = self.clone();
        for (key, theirs) in other {
            let next = match map.get(key) {
                Some(ours) => merge(key, ours, theirs),
                None => theirs.clone(),
            };
            map = map.add_or_update(key.clone(), next);
        }
        map
    }

    /// Keys present in both maps, with the receiver's values.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        self.filter(|key, _| other.contains_key(key))
    }

    /// Keys present in both maps, values reconciled with `merge`.
    #[must_use]
    pub fn intersect_with(&self, other: &Self, merge: impl Fn(&K, &V, &V) -> V) -> Self {
        self.intersect_with_map(other, merge)
    }

    /// Keys present in both maps, reconciling values of possibly differing
    /// types into a result type.
    #[must_use]
    pub fn intersect_with_map<W, R>(
        &self,
        other: &TrieMap<K, W>,
        merge: impl Fn(&K, &V, &W) -> R,
    ) -> TrieMap<K, R>
    where
        R: Hash + Clone,
    {
        let mut builder = TrieMapBuilder::new();
        for (key, ours) in self {
            if let Some(theirs) = other.get(key) {
                builder.insert(key.clone(), merge(key, ours, theirs));
            }
        }
        builder.freeze()
    }

    /// Keys of the receiver that are absent from `other`.
    #[must_use]
    pub fn except(&self, other: &Self) -> Self {
        self.filter(|key, _| !other.contains_key(key))
    }

    /// Keys present in exactly one of the two maps.
    #[must_use]
    pub fn symmetric_except(&self, other: &Self) -> Self {
        let mut builder = TrieMapBuilder::new();
        for (key, value) in self {
            if !other.contains_key(key) {
                builder.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in other {
            if !self.contains_key(key) {
                builder.insert(key.clone(), value.clone());
            }
        }
        builder.freeze()
    }
}

// ---------------------------------------------------------------------------
// Logged twins — changes are reported relative to the receiver
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> TrieMap<K, V> {
    /// [`union`](Self::union), aggregating one [`Change::Added`] per key
    /// taken from `other`.
    #[must_use]
    pub fn union_with_log(&self, other: &Self) -> (Self, TrieMap<K, Change<V>>) {
        let eq = |a: &V, b: &V| a == b;
        let mut map = self.clone();
        let mut log = TrieMap::new();
        for (key, value) in other {
            let (next, change) = map.try_add_with_log(key.clone(), value.clone());
            map = next;
            log = change::record(&log, key.clone(), change, &eq);
        }
        (map, log)
    }

    /// [`intersect`](Self::intersect), aggregating one [`Change::Removed`]
    /// per dropped key.
    #[must_use]
    pub fn intersect_with_log(&self, other: &Self) -> (Self, TrieMap<K, Change<V>>) {
        self.filter_with_log(|key, _| other.contains_key(key))
    }

    /// [`except`](Self::except), aggregating one [`Change::Removed`] per
    /// dropped key.
    #[must_use]
    pub fn except_with_log(&self, other: &Self) -> (Self, TrieMap<K, Change<V>>) {
        self.filter_with_log(|key, _| !other.contains_key(key))
    }

    /// [`symmetric_except`](Self::symmetric_except): [`Change::Removed`]
    /// for the receiver's dropped keys, [`Change::Added`] for keys adopted
    /// from `other`.
    #[must_use]
    pub fn symmetric_except_with_log(&self, other: &Self) -> (Self, TrieMap<K, Change<V>>) {
        let eq = |a: &V, b: &V| a == b;
        let (mut map, mut log) = self.filter_with_log(|key, _| !other.contains_key(key));
        for (key, value) in other {
            if !self.contains_key(key) {
                let (next, change) = map.try_add_with_log(key.clone(), value.clone());
                map = next;
                log = change::record(&log, key.clone(), change, &eq);
            }
        }
        (map, log)
    }
}
