//! The persistent CHAMP map.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::sync::Arc;

use crate::change::{self, Change};
use crate::hash;
use crate::iter::{Iter, Keys, Values};
use crate::node::{Entry, Node};
use crate::ops::get::get_recursive;
use crate::ops::remove::{RemoveOutcome, remove_recursive};
use crate::ops::update::{UpdateKind, UpdateOutcome, update_recursive};
use crate::{OnDuplicate, TrieError, TrieMapBuilder};

/// Persistent hash map based on a CHAMP trie.
///
/// Every mutator takes `&self` and returns a new map; unaffected subtrees
/// are shared by reference, so `Clone` and all snapshots are O(1). Old
/// references keep observing exactly the entries they held before the call.
pub struct TrieMap<K, V> {
    pub(crate) root: Option<Arc<Node<K, V>>>,
    pub(crate) size: usize,
    pub(crate) adhash: u64,
}

// ---------------------------------------------------------------------------
// Construction & accessors — no trait bounds
// ---------------------------------------------------------------------------

impl<K, V> TrieMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            size: 0,
            adhash: 0,
        }
    }

    /// Returns the number of key-value pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the current `AdHash` value.
    ///
    /// Maintained incrementally: two maps with the same `AdHash` and length
    /// contain the same entries with overwhelming probability, and equal
    /// maps always have equal `AdHash` values.
    #[must_use]
    pub const fn adhash(&self) -> u64 {
        self.adhash
    }

    /// Returns the empty map. Present snapshots are unaffected.
    #[must_use]
    pub const fn clear(&self) -> Self {
        Self::new()
    }

    /// Returns an iterator over `(&K, &V)` pairs in trie order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref())
    }

    /// Returns an iterator over keys in trie order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Returns an iterator over values in trie order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Seeds a [`TrieMapBuilder`] with this map's contents.
    ///
    /// The builder copies shared paths on first touch, so snapshots of this
    /// map stay intact.
    #[must_use]
    pub fn to_builder(&self) -> TrieMapBuilder<K, V> {
        TrieMapBuilder::from_parts(self.root.clone(), self.size, self.adhash)
    }
}

// ---------------------------------------------------------------------------
// Read operations — K: Hash + Eq
// ---------------------------------------------------------------------------

impl<K: Hash + Eq, V> TrieMap<K, V> {
    /// Returns a reference to the value associated with `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key-value pair for `key`.
    #[must_use]
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let root = self.root.as_deref()?;
        get_recursive(root, hash::hash_one(key), key, 0).map(|entry| (&entry.key, &entry.value))
    }

    /// Returns `true` if the map contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get_key_value(key).is_some()
    }

    /// Compares two maps with an explicit value-equality strategy.
    #[must_use]
    pub fn eq_by(&self, other: &Self, eq: impl Fn(&V, &V) -> bool) -> bool {
        self.size == other.size
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|o| eq(value, o)))
    }
}

// ---------------------------------------------------------------------------
// Write operations — K: Hash + Eq + Clone, V: Hash + Clone
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// Applies one update kind; returns `(new_map, old_value, changed)`.
    fn update(&self, kind: UpdateKind, key: K, value: V) -> Result<(Self, Option<V>, bool), TrieError> {
        let key_hash = hash::hash_one(&key);
        let entry = Entry {
            hash: key_hash,
            key,
            value,
        };

        let Some(root) = self.root.as_deref() else {
            return match kind {
                UpdateKind::SetItem => Err(TrieError::KeyNotFound),
                UpdateKind::TrySetItem => Ok((self.clone(), None, false)),
                UpdateKind::Add | UpdateKind::TryAdd | UpdateKind::AddOrUpdate => {
                    let contribution = entry.contribution();
                    let node = Node::single(entry, 0);
                    let map = Self {
                        root: Some(Arc::new(node)),
                        size: 1,
                        adhash: contribution,
                    };
                    Ok((map, None, true))
                }
            };
        };

        match update_recursive(root, kind, entry, 0)? {
            UpdateOutcome::Unchanged => Ok((self.clone(), None, false)),
            UpdateOutcome::Applied {
                node,
                old_value,
                adhash_delta,
            } => {
                let size = if old_value.is_some() {
                    self.size
                } else {
                    self.size + 1
                };
                let map = Self {
                    root: Some(node),
                    size,
                    adhash: self.adhash.wrapping_add(adhash_delta),
                };
                Ok((map, old_value, true))
            }
        }
    }

    /// Applies a total update kind (one that cannot fail).
    fn update_total(&self, kind: UpdateKind, key: K, value: V) -> (Self, Option<V>, bool) {
        let Ok(outcome) = self.update(kind, key, value) else {
            unreachable!("total update kinds never fail")
        };
        outcome
    }

    /// Inserts a new key.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] if the key is already present.
    pub fn add(&self, key: K, value: V) -> Result<Self, TrieError> {
        self.update(UpdateKind::Add, key, value).map(|(map, ..)| map)
    }

    /// Inserts a new key; returns the map unchanged if it is already present.
    #[must_use]
    pub fn try_add(&self, key: K, value: V) -> Self {
        self.update_total(UpdateKind::TryAdd, key, value).0
    }

    /// Inserts or replaces unconditionally.
    #[must_use]
    pub fn add_or_update(&self, key: K, value: V) -> Self {
        self.update_total(UpdateKind::AddOrUpdate, key, value).0
    }

    /// Replaces the value under an existing key with `update(current)`, or
    /// inserts `or_insert` if the key is missing.
    #[must_use]
    pub fn add_or_update_with(&self, key: K, update: impl FnOnce(&V) -> V, or_insert: V) -> Self {
        match self.get(&key) {
            Some(current) => {
                let next = update(current);
                self.add_or_update(key, next)
            }
            None => self.add_or_update(key, or_insert),
        }
    }

    /// Replaces the value under an existing key.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] if the key is missing.
    pub fn set_item(&self, key: K, value: V) -> Result<Self, TrieError> {
        self.update(UpdateKind::SetItem, key, value).map(|(map, ..)| map)
    }

    /// Replaces the value under an existing key; returns the map unchanged
    /// if the key is missing.
    #[must_use]
    pub fn try_set_item(&self, key: K, value: V) -> Self {
        self.update_total(UpdateKind::TrySetItem, key, value).0
    }

    /// Removes a key. Returns the map unchanged if the key is absent.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        self.remove_with_log(key).0
    }
}

// ---------------------------------------------------------------------------
// Change-logged twins
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// Shared plumbing for the `*_with_log` twins.
    fn update_with_log_by_kind(
        &self,
        kind: UpdateKind,
        key: K,
        value: V,
        eq: &dyn Fn(&V, &V) -> bool,
    ) -> Result<(Self, Change<V>), TrieError> {
        let written = value.clone();
        let (map, old_value, changed) = self.update(kind, key, value)?;
        if !changed {
            return Ok((map, Change::Unchanged));
        }
        let change = match old_value {
            None => Change::Added(written),
            Some(old) => {
                if eq(&old, &written) {
                    Change::Unchanged
                } else {
                    Change::Updated {
                        old,
                        new: written,
                    }
                }
            }
        };
        Ok((map, change))
    }

    /// [`add`](Self::add), also reporting the change.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] if the key is already present.
    pub fn add_with_log(&self, key: K, value: V) -> Result<(Self, Change<V>), TrieError> {
        self.update_with_log_by_kind(UpdateKind::Add, key, value, &|_, _| false)
    }

    /// [`try_add`](Self::try_add), also reporting the change.
    #[must_use]
    pub fn try_add_with_log(&self, key: K, value: V) -> (Self, Change<V>) {
        let Ok(outcome) = self.update_with_log_by_kind(UpdateKind::TryAdd, key, value, &|_, _| false)
        else {
            unreachable!("try_add never fails")
        };
        outcome
    }

    /// [`remove`](Self::remove), also reporting the change.
    #[must_use]
    pub fn remove_with_log(&self, key: &K) -> (Self, Change<V>) {
        let Some(root) = self.root.as_deref() else {
            return (self.clone(), Change::Unchanged);
        };
        match remove_recursive(root, hash::hash_one(key), key, 0) {
            RemoveOutcome::NotFound => (self.clone(), Change::Unchanged),
            RemoveOutcome::Removed {
                node,
                removed,
                adhash_delta,
            } => {
                let map = Self {
                    root: node,
                    size: self.size - 1,
                    adhash: self.adhash.wrapping_sub(adhash_delta),
                };
                (map, Change::Removed(removed))
            }
        }
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone + PartialEq> TrieMap<K, V> {
    /// [`add_or_update`](Self::add_or_update), also reporting the change.
    ///
    /// Replacing a value with an equal one reports [`Change::Unchanged`].
    #[must_use]
    pub fn add_or_update_with_log(&self, key: K, value: V) -> (Self, Change<V>) {
        self.add_or_update_with_log_by(key, value, |a, b| a == b)
    }

    /// [`set_item`](Self::set_item), also reporting the change.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] if the key is missing.
    pub fn set_item_with_log(&self, key: K, value: V) -> Result<(Self, Change<V>), TrieError> {
        self.set_item_with_log_by(key, value, |a, b| a == b)
    }

    /// [`try_set_item`](Self::try_set_item), also reporting the change.
    #[must_use]
    pub fn try_set_item_with_log(&self, key: K, value: V) -> (Self, Change<V>) {
        self.try_set_item_with_log_by(key, value, |a, b| a == b)
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// [`add_or_update_with_log`](Self::add_or_update_with_log) with an
    /// explicit value-equality strategy.
    #[must_use]
    pub fn add_or_update_with_log_by(
        &self,
        key: K,
        value: V,
        eq: impl Fn(&V, &V) -> bool,
    ) -> (Self, Change<V>) {
        let Ok(outcome) = self.update_with_log_by_kind(UpdateKind::AddOrUpdate, key, value, &eq)
        else {
            unreachable!("add_or_update never fails")
        };
        outcome
    }

    /// [`set_item_with_log`](Self::set_item_with_log) with an explicit
    /// value-equality strategy.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] if the key is missing.
    pub fn set_item_with_log_by(
        &self,
        key: K,
        value: V,
        eq: impl Fn(&V, &V) -> bool,
    ) -> Result<(Self, Change<V>), TrieError> {
        self.update_with_log_by_kind(UpdateKind::SetItem, key, value, &eq)
    }

    /// [`try_set_item_with_log`](Self::try_set_item_with_log) with an
    /// explicit value-equality strategy.
    #[must_use]
    pub fn try_set_item_with_log_by(
        &self,
        key: K,
        value: V,
        eq: impl Fn(&V, &V) -> bool,
    ) -> (Self, Change<V>) {
        let Ok(outcome) = self.update_with_log_by_kind(UpdateKind::TrySetItem, key, value, &eq)
        else {
            unreachable!("try_set_item never fails")
        };
        outcome
    }
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// Builds a map from an iterable with an explicit duplicate policy and
    /// bulk in-place construction.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] under [`OnDuplicate::Error`] when a key
    /// repeats.
    pub fn from_entries(
        pairs: impl IntoIterator<Item = (K, V)>,
        on_duplicate: OnDuplicate,
    ) -> Result<Self, TrieError> {
        let mut builder = TrieMapBuilder::new();
        for (key, value) in pairs {
            match on_duplicate {
                OnDuplicate::Replace => {
                    builder.insert(key, value);
                }
                OnDuplicate::Error => {
                    if builder.insert(key, value).is_some() {
                        return Err(TrieError::DuplicateKey);
                    }
                }
                OnDuplicate::Ignore => {
                    if !builder.contains_key(&key) {
                        builder.insert(key, value);
                    }
                }
            }
        }
        Ok(builder.freeze())
    }

    /// Strictly adds every pair.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] on the first already-present key.
    pub fn add_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, TrieError> {
        let mut map = self.clone();
        for (key, value) in pairs {
            map = map.add(key, value)?;
        }
        Ok(map)
    }

    /// Adds every pair whose key is not yet present.
    #[must_use]
    pub fn try_add_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut map = self.clone();
        for (key, value) in pairs {
            map = map.try_add(key, value);
        }
        map
    }

    /// Inserts or replaces every pair.
    #[must_use]
    pub fn add_or_update_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut map = self.clone();
        for (key, value) in pairs {
            map = map.add_or_update(key, value);
        }
        map
    }

    /// Strictly replaces the value under every pair's key.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] on the first missing key.
    pub fn set_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, TrieError> {
        let mut map = self.clone();
        for (key, value) in pairs {
            map = map.set_item(key, value)?;
        }
        Ok(map)
    }

    /// Removes every key in the iterable.
    #[must_use]
    pub fn remove_range(&self, keys: impl IntoIterator<Item = K>) -> Self {
        let mut map = self.clone();
        for key in keys {
            map = map.remove(&key);
        }
        map
    }

    /// [`add_or_update_range`](Self::add_or_update_range), aggregating the
    /// detected changes into a sparse diff map.
    #[must_use]
    pub fn add_or_update_range_with_log(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> (Self, TrieMap<K, Change<V>>)
    where
        V: PartialEq,
    {
        let eq = |a: &V, b: &V| a == b;
        let mut map = self.clone();
        let mut log = TrieMap::new();
        for (key, value) in pairs {
            let (next, change) = map.add_or_update_with_log_by(key.clone(), value, eq);
            map = next;
            log = change::record(&log, key, change, &eq);
        }
        (map, log)
    }

    /// [`remove_range`](Self::remove_range), aggregating the detected
    /// changes into a sparse diff map.
    #[must_use]
    pub fn remove_range_with_log(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> (Self, TrieMap<K, Change<V>>)
    where
        V: PartialEq,
    {
        let eq = |a: &V, b: &V| a == b;
        let mut map = self.clone();
        let mut log = TrieMap::new();
        for key in keys {
            let (next, change) = map.remove_with_log(&key);
            map = next;
            log = change::record(&log, key, change, &eq);
        }
        (map, log)
    }
}

// ---------------------------------------------------------------------------
// Transformation
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMap<K, V> {
    /// Maps every value through `f`, preserving the trie shape.
    ///
    /// Key hashes are unchanged, so the result shares no work with lookup
    /// paths — only the value arrays are rebuilt.
    #[must_use]
    pub fn map_values<W: Hash + Clone>(&self, f: impl Fn(&K, &V) -> W) -> TrieMap<K, W> {
        match self.root.as_deref() {
            None => TrieMap::new(),
            Some(root) => {
                let (node, adhash) = map_node(root, &f);
                TrieMap {
                    root: Some(node),
                    size: self.size,
                    adhash,
                }
            }
        }
    }

    /// Keeps only the entries satisfying `pred`.
    #[must_use]
    pub fn filter(&self, pred: impl Fn(&K, &V) -> bool) -> Self {
        self.filter_with_log(pred).0
    }

    /// [`filter`](Self::filter), aggregating one [`Change::Removed`] per
    /// dropped key into a diff map.
    #[must_use]
    pub fn filter_with_log(&self, pred: impl Fn(&K, &V) -> bool) -> (Self, TrieMap<K, Change<V>>) {
        let mut kept = TrieMapBuilder::new();
        let mut log = TrieMapBuilder::new();
        for (key, value) in self {
            if pred(key, value) {
                kept.insert(key.clone(), value.clone());
            } else {
                log.insert(key.clone(), Change::Removed(value.clone()));
            }
        }
        (kept.freeze(), log.freeze())
    }

    /// Copies the entries into a standard [`HashMap`].
    #[must_use]
    pub fn to_hashmap(&self) -> HashMap<K, V> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Structurally maps a subtree's values, returning the new node and its
/// `AdHash` sum.
fn map_node<K: Clone, V, W: Hash>(
    node: &Node<K, V>,
    f: &impl Fn(&K, &V) -> W,
) -> (Arc<Node<K, W>>, u64) {
    let map_entries = |entries: &[Entry<K, V>]| {
        let mut adhash = 0_u64;
        let mapped: Vec<Entry<K, W>> = entries
            .iter()
            .map(|entry| {
                let next = Entry {
                    hash: entry.hash,
                    key: entry.key.clone(),
                    value: f(&entry.key, &entry.value),
                };
                adhash = adhash.wrapping_add(next.contribution());
                next
            })
            .collect();
        (mapped, adhash)
    };

    match node {
        Node::Inner {
            data_map,
            node_map,
            entries,
            children,
        } => {
            let (mapped, mut adhash) = map_entries(entries);
            let mapped_children = children
                .iter()
                .map(|child| {
                    let (node, child_adhash) = map_node(child, f);
                    adhash = adhash.wrapping_add(child_adhash);
                    node
                })
                .collect();
            let node = Node::Inner {
                data_map: *data_map,
                node_map: *node_map,
                entries: mapped,
                children: mapped_children,
            };
            (Arc::new(node), adhash)
        }
        Node::Collision { hash, entries } => {
            let (mapped, adhash) = map_entries(entries);
            let node = Node::Collision {
                hash: *hash,
                entries: mapped,
            };
            (Arc::new(node), adhash)
        }
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K, V> Clone for TrieMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
            adhash: self.adhash,
        }
    }
}

impl<K, V> Default for TrieMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for TrieMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieMap")
            .field("len", &self.size)
            .field("adhash", &format_args!("{:#018x}", self.adhash))
            .finish_non_exhaustive()
    }
}

/// Structural equality: same length and, for every key in one map, an equal
/// value under the same key in the other.
///
/// The `AdHash` is used as an O(1) rejection path; it assumes `V::hash` is
/// consistent with `V::eq`, the standard-library convention.
impl<K: Hash + Eq, V: PartialEq> PartialEq for TrieMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size || self.adhash != other.adhash {
            return false;
        }
        self.eq_by(other, |a, b| a == b)
    }
}

impl<K: Hash + Eq, V: Eq> Eq for TrieMap<K, V> {}

impl<K, V> Hash for TrieMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.adhash);
        state.write_usize(self.size);
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone> FromIterator<(K, V)> for TrieMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let Ok(map) = Self::from_entries(iter, OnDuplicate::Replace) else {
            unreachable!("replace policy never fails")
        };
        map
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone> From<HashMap<K, V>> for TrieMap<K, V> {
    fn from(map: HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Hash + Eq, V> ops::Index<&K> for TrieMap<K, V> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<'a, K, V> IntoIterator for &'a TrieMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
