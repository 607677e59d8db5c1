//! Update operation — path-copy write with five caller-selected behaviors.

use std::hash::Hash;
use std::sync::Arc;

use crate::TrieError;
use crate::node::{self, Entry, Node};

/// Behavior of [`update_recursive`] on key-present / key-missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Insert; error if the key is already present.
    Add,
    /// Insert; no-op if the key is already present.
    TryAdd,
    /// Insert or replace unconditionally.
    AddOrUpdate,
    /// Replace; error if the key is missing.
    SetItem,
    /// Replace; no-op if the key is missing.
    TrySetItem,
}

impl UpdateKind {
    /// Outcome when the key is absent: `Ok(true)` inserts, `Ok(false)` is a
    /// no-op, `Err` aborts.
    fn on_missing(self) -> Result<bool, TrieError> {
        match self {
            Self::Add | Self::TryAdd | Self::AddOrUpdate => Ok(true),
            Self::SetItem => Err(TrieError::KeyNotFound),
            Self::TrySetItem => Ok(false),
        }
    }

    /// Outcome when the key is present: `Ok(true)` replaces, `Ok(false)` is
    /// a no-op, `Err` aborts.
    fn on_present(self) -> Result<bool, TrieError> {
        match self {
            Self::AddOrUpdate | Self::SetItem | Self::TrySetItem => Ok(true),
            Self::Add => Err(TrieError::DuplicateKey),
            Self::TryAdd => Ok(false),
        }
    }
}

/// Outcome of a recursive update.
pub enum UpdateOutcome<K, V> {
    /// A `try_*` kind hit its no-op case — tree unchanged.
    Unchanged,
    /// The write was applied.
    Applied {
        /// New root of the modified subtree.
        node: Arc<Node<K, V>>,
        /// Replaced value, or `None` if a new key was inserted.
        old_value: Option<V>,
        /// Wrapping `AdHash` delta to add to the map's hash.
        adhash_delta: u64,
    },
}

/// Writes `entry` into the subtree rooted at `node` via path-copy.
pub fn update_recursive<K, V>(
    node: &Node<K, V>,
    kind: UpdateKind,
    entry: Entry<K, V>,
    shift: u32,
) -> Result<UpdateOutcome<K, V>, TrieError>
where
    K: Eq + Clone,
    V: Hash + Clone,
{
    match node {
        Node::Inner {
            data_map,
            node_map,
            entries,
            children,
        } => update_inner(*data_map, *node_map, entries, children, kind, entry, shift),
        Node::Collision {
            hash: node_hash,
            entries,
        } => update_collision(*node_hash, entries, kind, entry),
    }
}

// ---------------------------------------------------------------------------
// Inner node update
// ---------------------------------------------------------------------------

fn update_inner<K, V>(
    data_map: u32,
    node_map: u32,
    entries: &[Entry<K, V>],
    children: &[Arc<Node<K, V>>],
    kind: UpdateKind,
    entry: Entry<K, V>,
    shift: u32,
) -> Result<UpdateOutcome<K, V>, TrieError>
where
    K: Eq + Clone,
    V: Hash + Clone,
{
    let bit = node::mask(node::fragment(entry.hash, shift));

    if data_map & bit != 0 {
        let pos = node::index(data_map, bit);
        let existing = &entries[pos];

        if existing.hash == entry.hash && existing.key == entry.key {
            // Same key → replace the value.
            if !kind.on_present()? {
                return Ok(UpdateOutcome::Unchanged);
            }
            let delta = entry.contribution().wrapping_sub(existing.contribution());
            let old_value = existing.value.clone();
            let new_node = Node::Inner {
                data_map,
                node_map,
                entries: node::replaced_at(entries, pos, entry),
                children: children.to_vec(),
            };
            Ok(UpdateOutcome::Applied {
                node: Arc::new(new_node),
                old_value: Some(old_value),
                adhash_delta: delta,
            })
        } else {
            // Different key at the same position → push both into a subtree.
            if !kind.on_missing()? {
                return Ok(UpdateOutcome::Unchanged);
            }
            let contribution = entry.contribution();
            let subtree = split_entries(
                existing.clone(),
                entry,
                shift + node::BITS_PER_LEVEL,
            );

            let new_node_map = node_map | bit;
            let child_pos = node::index(new_node_map, bit);
            let new_node = Node::Inner {
                data_map: data_map & !bit,
                node_map: new_node_map,
                entries: node::removed_at(entries, pos),
                children: node::inserted_at(children, child_pos, subtree),
            };
            Ok(UpdateOutcome::Applied {
                node: Arc::new(new_node),
                old_value: None,
                adhash_delta: contribution,
            })
        }
    } else if node_map & bit != 0 {
        // Position holds a child subtree → recurse.
        let child_pos = node::index(node_map, bit);
        match update_recursive(&children[child_pos], kind, entry, shift + node::BITS_PER_LEVEL)? {
            UpdateOutcome::Unchanged => Ok(UpdateOutcome::Unchanged),
            UpdateOutcome::Applied {
                node: new_child,
                old_value,
                adhash_delta,
            } => {
                let new_node = Node::Inner {
                    data_map,
                    node_map,
                    entries: entries.to_vec(),
                    children: node::replaced_at(children, child_pos, new_child),
                };
                Ok(UpdateOutcome::Applied {
                    node: Arc::new(new_node),
                    old_value,
                    adhash_delta,
                })
            }
        }
    } else {
        // Position empty → add inline entry.
        if !kind.on_missing()? {
            return Ok(UpdateOutcome::Unchanged);
        }
        let contribution = entry.contribution();
        let new_data_map = data_map | bit;
        let insert_at = node::index(new_data_map, bit);
        let new_node = Node::Inner {
            data_map: new_data_map,
            node_map,
            entries: node::inserted_at(entries, insert_at, entry),
            children: children.to_vec(),
        };
        Ok(UpdateOutcome::Applied {
            node: Arc::new(new_node),
            old_value: None,
            adhash_delta: contribution,
        })
    }
}

// ---------------------------------------------------------------------------
// Collision node update
// ---------------------------------------------------------------------------

fn update_collision<K, V>(
    node_hash: u64,
    entries: &[Entry<K, V>],
    kind: UpdateKind,
    entry: Entry<K, V>,
) -> Result<UpdateOutcome<K, V>, TrieError>
where
    K: Eq + Clone,
    V: Hash + Clone,
{
    if let Some(pos) = entries.iter().position(|e| e.key == entry.key) {
        if !kind.on_present()? {
            return Ok(UpdateOutcome::Unchanged);
        }
        let existing = &entries[pos];
        let delta = entry.contribution().wrapping_sub(existing.contribution());
        let old_value = existing.value.clone();
        let new_node = Node::Collision {
            hash: node_hash,
            entries: node::replaced_at(entries, pos, entry),
        };
        Ok(UpdateOutcome::Applied {
            node: Arc::new(new_node),
            old_value: Some(old_value),
            adhash_delta: delta,
        })
    } else {
        if !kind.on_missing()? {
            return Ok(UpdateOutcome::Unchanged);
        }
        let contribution = entry.contribution();
        let mut new_entries = entries.to_vec();
        new_entries.push(entry);
        let new_node = Node::Collision {
            hash: node_hash,
            entries: new_entries,
        };
        Ok(UpdateOutcome::Applied {
            node: Arc::new(new_node),
            old_value: None,
            adhash_delta: contribution,
        })
    }
}

// ---------------------------------------------------------------------------
// Subtree split
// ---------------------------------------------------------------------------

/// Builds a subtree from two entries that collide at the current depth.
///
/// Descends until the hash fragments differ, or produces a collision node
/// once the hash is exhausted past [`MAX_SHIFT`](node::MAX_SHIFT).
pub fn split_entries<K, V>(e1: Entry<K, V>, e2: Entry<K, V>, shift: u32) -> Arc<Node<K, V>> {
    if shift > node::MAX_SHIFT {
        let hash = e1.hash;
        return Arc::new(Node::Collision {
            hash,
            entries: vec![e1, e2],
        });
    }

    let f1 = node::fragment(e1.hash, shift);
    let f2 = node::fragment(e2.hash, shift);

    if f1 == f2 {
        let child = split_entries(e1, e2, shift + node::BITS_PER_LEVEL);
        Arc::new(Node::Inner {
            data_map: 0,
            node_map: node::mask(f1),
            entries: Vec::new(),
            children: vec![child],
        })
    } else {
        let entries = if f1 < f2 { vec![e1, e2] } else { vec![e2, e1] };
        Arc::new(Node::Inner {
            data_map: node::mask(f1) | node::mask(f2),
            node_map: 0,
            entries,
            children: Vec::new(),
        })
    }
}
