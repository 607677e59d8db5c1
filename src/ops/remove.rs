//! Removal operation — path-copy delete with canonical inlining.

use std::hash::Hash;
use std::sync::Arc;

use crate::node::{self, Entry, Node};

/// Outcome of a recursive remove.
pub enum RemoveOutcome<K, V> {
    /// Key was not found — tree unchanged.
    NotFound,
    /// Key was removed.
    Removed {
        /// New root of the modified subtree, or `None` if it is now empty.
        node: Option<Arc<Node<K, V>>>,
        /// The removed value.
        removed: V,
        /// Wrapping `AdHash` delta to subtract from the map's hash.
        adhash_delta: u64,
    },
}

/// Removes `key` from the subtree rooted at `node` via path-copy.
pub fn remove_recursive<K, V>(
    node: &Node<K, V>,
    hash: u64,
    key: &K,
    shift: u32,
) -> RemoveOutcome<K, V>
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
        } => remove_inner(*data_map, *node_map, entries, children, hash, key, shift),
        Node::Collision {
            hash: node_hash,
            entries,
        } => remove_collision(*node_hash, entries, hash, key),
    }
}

// ---------------------------------------------------------------------------
// Inner node remove
// ---------------------------------------------------------------------------

fn remove_inner<K, V>(
    data_map: u32,
    node_map: u32,
    entries: &[Entry<K, V>],
    children: &[Arc<Node<K, V>>],
    hash: u64,
    key: &K,
    shift: u32,
) -> RemoveOutcome<K, V>
where
    K: Eq + Clone,
    V: Hash + Clone,
{
    let bit = node::mask(node::fragment(hash, shift));

    if data_map & bit != 0 {
        let pos = node::index(data_map, bit);
        let entry = &entries[pos];
        if entry.hash != hash || entry.key != *key {
            return RemoveOutcome::NotFound;
        }

        let adhash_delta = entry.contribution();
        let removed = entry.value.clone();
        let new_data_map = data_map & !bit;

        // Last entry and no children → empty subtree.
        if new_data_map == 0 && node_map == 0 {
            return RemoveOutcome::Removed {
                node: None,
                removed,
                adhash_delta,
            };
        }

        let new_node = Node::Inner {
            data_map: new_data_map,
            node_map,
            entries: node::removed_at(entries, pos),
            children: children.to_vec(),
        };
        RemoveOutcome::Removed {
            node: Some(Arc::new(new_node)),
            removed,
            adhash_delta,
        }
    } else if node_map & bit != 0 {
        let child_pos = node::index(node_map, bit);
        match remove_recursive(&children[child_pos], hash, key, shift + node::BITS_PER_LEVEL) {
            RemoveOutcome::NotFound => RemoveOutcome::NotFound,
            RemoveOutcome::Removed {
                node: Some(new_child),
                removed,
                adhash_delta,
            } => {
                let new_node = if should_inline(&new_child) {
                    inline_child(data_map, node_map, entries, children, bit, child_pos, &new_child)
                } else {
                    Node::Inner {
                        data_map,
                        node_map,
                        entries: entries.to_vec(),
                        children: node::replaced_at(children, child_pos, new_child),
                    }
                };
                RemoveOutcome::Removed {
                    node: Some(Arc::new(new_node)),
                    removed,
                    adhash_delta,
                }
            }
            RemoveOutcome::Removed {
                node: None,
                removed,
                adhash_delta,
            } => {
                // Child became empty — drop its slot.
                let new_node_map = node_map & !bit;
                if data_map == 0 && new_node_map == 0 {
                    return RemoveOutcome::Removed {
                        node: None,
                        removed,
                        adhash_delta,
                    };
                }
                let new_node = Node::Inner {
                    data_map,
                    node_map: new_node_map,
                    entries: entries.to_vec(),
                    children: node::removed_at(children, child_pos),
                };
                RemoveOutcome::Removed {
                    node: Some(Arc::new(new_node)),
                    removed,
                    adhash_delta,
                }
            }
        }
    } else {
        RemoveOutcome::NotFound
    }
}

/// Canonical form: a child with exactly one entry and no children is
/// promoted back into the parent's entry array.
fn should_inline<K, V>(node: &Node<K, V>) -> bool {
    match node {
        Node::Inner {
            data_map, node_map, ..
        } => data_map.is_power_of_two() && *node_map == 0,
        Node::Collision { .. } => false,
    }
}

/// Inlines a single-entry child back into the parent node.
fn inline_child<K, V>(
    data_map: u32,
    node_map: u32,
    entries: &[Entry<K, V>],
    children: &[Arc<Node<K, V>>],
    bit: u32,
    child_pos: usize,
    child: &Node<K, V>,
) -> Node<K, V>
where
    K: Clone,
    V: Clone,
{
    let inlined = match child {
        Node::Inner { entries, .. } => entries[0].clone(),
        Node::Collision { .. } => unreachable!("collision nodes are never inlined"),
    };

    let new_data_map = data_map | bit;
    let insert_at = node::index(new_data_map, bit);
    Node::Inner {
        data_map: new_data_map,
        node_map: node_map & !bit,
        entries: node::inserted_at(entries, insert_at, inlined),
        children: node::removed_at(children, child_pos),
    }
}

// ---------------------------------------------------------------------------
// Collision node remove
// ---------------------------------------------------------------------------

fn remove_collision<K, V>(
    node_hash: u64,
    entries: &[Entry<K, V>],
    hash: u64,
    key: &K,
) -> RemoveOutcome<K, V>
where
    K: Eq + Clone,
    V: Hash + Clone,
{
    if hash != node_hash {
        return RemoveOutcome::NotFound;
    }

    let Some(pos) = entries.iter().position(|e| e.key == *key) else {
        return RemoveOutcome::NotFound;
    };

    let adhash_delta = entries[pos].contribution();
    let removed = entries[pos].value.clone();

    if entries.len() == 2 {
        // One entry left — promote it to a single-entry inner node. The bit
        // position is a placeholder: the parent inlines this node on unwind,
        // so the bitmap is never consulted for lookup.
        let remaining = entries[1 - pos].clone();
        return RemoveOutcome::Removed {
            node: Some(Arc::new(Node::single(remaining, 0))),
            removed,
            adhash_delta,
        };
    }

    let new_node = Node::Collision {
        hash: node_hash,
        entries: node::removed_at(entries, pos),
    };
    RemoveOutcome::Removed {
        node: Some(Arc::new(new_node)),
        removed,
        adhash_delta,
    }
}
