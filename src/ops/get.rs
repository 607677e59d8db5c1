//! Lookup operation — traverses the trie to find a key.

use crate::node::{self, Entry, Node};

/// Searches for `key` in the subtree rooted at `node`.
///
/// Returns the owning entry if found.
pub fn get_recursive<'a, K, V>(
    node: &'a Node<K, V>,
    hash: u64,
    key: &K,
    shift: u32,
) -> Option<&'a Entry<K, V>>
where
    K: Eq,
{
    match node {
        Node::Inner {
            data_map,
            node_map,
            entries,
            children,
        } => {
            let bit = node::mask(node::fragment(hash, shift));

            if data_map & bit != 0 {
                // Position holds an inline entry.
                let entry = &entries[node::index(*data_map, bit)];
                (entry.hash == hash && entry.key == *key).then_some(entry)
            } else if node_map & bit != 0 {
                // Position holds a child subtree — recurse.
                let child = &children[node::index(*node_map, bit)];
                get_recursive(child, hash, key, shift + node::BITS_PER_LEVEL)
            } else {
                None
            }
        }
        Node::Collision {
            hash: node_hash,
            entries,
        } => {
            if hash != *node_hash {
                return None;
            }
            // Linear scan through colliding entries.
            entries.iter().find(|entry| entry.key == *key)
        }
    }
}
