//! Change-tracking view over a [`TrieMap`].

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::change::{self, Change, ValueEq};
use crate::{TrieError, TrieMap};

/// A pure, composable view that records the net per-key effect of a
/// sequence of map operations.
///
/// Used by [`AtomMap::swap`](crate::AtomMap::swap) so a whole transaction
/// can be applied atomically and published with one batch patch. Changes to
/// the same key are merged: an `add` followed by a `remove` nets out to no
/// change, a `remove` followed by re-adding an equal value likewise.
pub struct TrackedMap<K, V: 'static> {
    inner: TrieMap<K, V>,
    log: TrieMap<K, Change<V>>,
    eq: ValueEq<V>,
}

impl<K, V: 'static> TrackedMap<K, V> {
    /// Wraps a map, comparing values with `PartialEq`.
    #[must_use]
    pub fn new(map: TrieMap<K, V>) -> Self
    where
        V: PartialEq + 'static,
    {
        Self::with_eq(map, Arc::new(|a: &V, b: &V| a == b))
    }

    /// Wraps a map with an explicit value-equality strategy.
    #[must_use]
    pub fn with_eq(map: TrieMap<K, V>, eq: ValueEq<V>) -> Self {
        Self {
            inner: map,
            log: TrieMap::new(),
            eq,
        }
    }

    /// The current state of the view.
    #[must_use]
    pub const fn snapshot(&self) -> &TrieMap<K, V> {
        &self.inner
    }

    /// The net changes recorded so far, keyed like the map.
    #[must_use]
    pub const fn changes(&self) -> &TrieMap<K, Change<V>> {
        &self.log
    }

    /// Returns `true` if any key has a net change.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }

    /// Splits the view into the final map and its diff.
    #[must_use]
    pub fn into_parts(self) -> (TrieMap<K, V>, TrieMap<K, Change<V>>) {
        (self.inner, self.log)
    }

    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Hash + Eq, V: 'static> TrackedMap<K, V> {
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + 'static> TrackedMap<K, V> {
    fn apply(mut self, map: TrieMap<K, V>, key: K, change: Change<V>) -> Self {
        self.log = change::record(&self.log, key, change, &*self.eq);
        self.inner = map;
        self
    }

    /// Strictly inserts a new key.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] if the key is already present.
    pub fn add(self, key: K, value: V) -> Result<Self, TrieError> {
        let (map, change) = self.inner.add_with_log(key.clone(), value)?;
        Ok(self.apply(map, key, change))
    }

    /// Inserts a new key; no-op if it is already present.
    #[must_use]
    pub fn try_add(self, key: K, value: V) -> Self {
        let (map, change) = self.inner.try_add_with_log(key.clone(), value);
        self.apply(map, key, change)
    }

    /// Inserts or replaces unconditionally.
    #[must_use]
    pub fn add_or_update(self, key: K, value: V) -> Self {
        let (map, change) = self
            .inner
            .add_or_update_with_log_by(key.clone(), value, |a, b| (self.eq)(a, b));
        self.apply(map, key, change)
    }

    /// Strictly replaces the value under an existing key.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] if the key is missing.
    pub fn set_item(self, key: K, value: V) -> Result<Self, TrieError> {
        let (map, change) =
            self.inner
                .set_item_with_log_by(key.clone(), value, |a, b| (self.eq)(a, b))?;
        Ok(self.apply(map, key, change))
    }

    /// Replaces the value under an existing key; no-op if it is missing.
    #[must_use]
    pub fn try_set_item(self, key: K, value: V) -> Self {
        let (map, change) =
            self.inner
                .try_set_item_with_log_by(key.clone(), value, |a, b| (self.eq)(a, b));
        self.apply(map, key, change)
    }

    /// Removes a key; no-op if it is absent.
    #[must_use]
    pub fn remove(self, key: &K) -> Self {
        let (map, change) = self.inner.remove_with_log(key);
        self.apply(map, key.clone(), change)
    }

    /// Removes every entry, recording one [`Change::Removed`] per key.
    #[must_use]
    pub fn clear(mut self) -> Self {
        let snapshot = self.inner.clone();
        for (key, value) in &snapshot {
            self.log = change::record(
                &self.log,
                key.clone(),
                Change::Removed(value.clone()),
                &*self.eq,
            );
        }
        self.inner = TrieMap::new();
        self
    }
}

impl<K, V: 'static> fmt::Debug for TrackedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedMap")
            .field("len", &self.inner.len())
            .field("changed_keys", &self.log.len())
            .finish_non_exhaustive()
    }
}
