//! Bulk construction with in-place mutation.

use std::hash::Hash;
use std::sync::Arc;

use crate::TrieMap;
use crate::hash;
use crate::node::{self, Entry, Node};
use crate::ops::get::get_recursive;
use crate::ops::update::split_entries;

/// Builds a [`TrieMap`] from many insertions without per-step path copies.
///
/// The builder owns its root exclusively, so `Arc::make_mut` rewrites nodes
/// in place — the refcount is the proof that no published map can observe
/// the intermediate structure. Seeding from an existing map via
/// [`TrieMap::to_builder`] shares that map's subtrees and copies each path
/// on first touch. [`freeze`](Self::freeze) publishes the immutable value.
pub struct TrieMapBuilder<K, V> {
    root: Option<Arc<Node<K, V>>>,
    size: usize,
    adhash: u64,
}

impl<K, V> TrieMapBuilder<K, V> {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            size: 0,
            adhash: 0,
        }
    }

    pub(crate) const fn from_parts(root: Option<Arc<Node<K, V>>>, size: usize, adhash: u64) -> Self {
        Self { root, size, adhash }
    }

    /// Returns the number of key-value pairs inserted so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if nothing has been inserted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Publishes the accumulated entries as an immutable [`TrieMap`].
    #[must_use]
    pub fn freeze(self) -> TrieMap<K, V> {
        TrieMap {
            root: self.root,
            size: self.size,
            adhash: self.adhash,
        }
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone> TrieMapBuilder<K, V> {
    /// Returns `true` if the key has been inserted.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.root
            .as_deref()
            .is_some_and(|root| get_recursive(root, hash::hash_one(key), key, 0).is_some())
    }

    /// Inserts or replaces a pair, mutating uniquely-owned nodes in place.
    ///
    /// Returns the replaced value, or `None` if the key was new.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let key_hash = hash::hash_one(&key);
        let entry = Entry {
            hash: key_hash,
            key,
            value,
        };

        let Some(root) = self.root.as_mut() else {
            self.adhash = entry.contribution();
            self.root = Some(Arc::new(Node::single(entry, 0)));
            self.size = 1;
            return None;
        };

        let (old_value, adhash_delta) = insert_mut(root, entry, 0);
        if old_value.is_none() {
            self.size += 1;
        }
        self.adhash = self.adhash.wrapping_add(adhash_delta);
        old_value
    }
}

/// Add-or-update into the subtree behind `node`, copying shared nodes on
/// first touch and mutating unique ones directly.
///
/// Returns the replaced value and the wrapping `AdHash` delta.
fn insert_mut<K, V>(node: &mut Arc<Node<K, V>>, entry: Entry<K, V>, shift: u32) -> (Option<V>, u64)
where
    K: Hash + Eq + Clone,
    V: Hash + Clone,
{
    match Arc::make_mut(node) {
        Node::Inner {
            data_map,
            node_map,
            entries,
            children,
        } => {
            let bit = node::mask(node::fragment(entry.hash, shift));

            if *data_map & bit != 0 {
                let pos = node::index(*data_map, bit);
                if entries[pos].hash == entry.hash && entries[pos].key == entry.key {
                    let old_contribution = entries[pos].contribution();
                    let delta = entry.contribution().wrapping_sub(old_contribution);
                    let old = std::mem::replace(&mut entries[pos].value, entry.value);
                    (Some(old), delta)
                } else {
                    let contribution = entry.contribution();
                    let existing = entries.remove(pos);
                    let subtree = split_entries(existing, entry, shift + node::BITS_PER_LEVEL);
                    *data_map &= !bit;
                    *node_map |= bit;
                    children.insert(node::index(*node_map, bit), subtree);
                    (None, contribution)
                }
            } else if *node_map & bit != 0 {
                let child = &mut children[node::index(*node_map, bit)];
                insert_mut(child, entry, shift + node::BITS_PER_LEVEL)
            } else {
                let contribution = entry.contribution();
                *data_map |= bit;
                entries.insert(node::index(*data_map, bit), entry);
                (None, contribution)
            }
        }
        Node::Collision { entries, .. } => {
            if let Some(existing) = entries.iter_mut().find(|e| e.key == entry.key) {
                let old_contribution = existing.contribution();
                let delta = entry.contribution().wrapping_sub(old_contribution);
                let old = std::mem::replace(&mut existing.value, entry.value);
                (Some(old), delta)
            } else {
                let contribution = entry.contribution();
                entries.push(entry);
                (None, contribution)
            }
        }
    }
}

impl<K, V> Default for TrieMapBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Hash + Clone> Extend<(K, V)> for TrieMapBuilder<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
