//! CHAMP trie node types, bitmap helpers, and array-splice helpers.

use std::fmt;
use std::sync::Arc;

use crate::hash;

/// Bits consumed per trie level (5 → 32-way branching).
pub const BITS_PER_LEVEL: u32 = 5;

/// Maximum bit-shift value; past this the 64-bit hash is exhausted and
/// colliding keys fall back to [`Node::Collision`].
pub const MAX_SHIFT: u32 = 60;

/// Inline entry storing a key-value pair with its precomputed hash.
#[derive(Clone)]
pub struct Entry<K, V> {
    /// Precomputed 64-bit hash of the key.
    pub hash: u64,
    /// The key.
    pub key: K,
    /// The value.
    pub value: V,
}

impl<K, V> Entry<K, V> {
    /// The `AdHash` contribution of this entry.
    #[must_use]
    pub fn contribution(&self) -> u64
    where
        V: std::hash::Hash,
    {
        hash::entry_contribution(self.hash, hash::hash_one(&self.value))
    }
}

/// CHAMP trie node.
///
/// A closed sum of two variants; the empty map is an absent root, not a
/// node variant.
#[derive(Clone)]
pub enum Node<K, V> {
    /// Bitmap-compressed inner node.
    ///
    /// Invariants: `data_map & node_map == 0`,
    /// `entries.len() == data_map.count_ones()`,
    /// `children.len() == node_map.count_ones()`, both arrays ordered by
    /// ascending bit position.
    Inner {
        /// Bitmap of positions occupied by inline entries.
        data_map: u32,
        /// Bitmap of positions occupied by child subtrees.
        node_map: u32,
        /// Inline entries, compacted.
        entries: Vec<Entry<K, V>>,
        /// Child subtrees, compacted and structurally shared.
        children: Vec<Arc<Node<K, V>>>,
    },
    /// Flat node for keys sharing one full 64-bit hash.
    ///
    /// Invariant: `entries.len() >= 2`, all keys distinct.
    Collision {
        /// The shared hash value.
        hash: u64,
        /// The colliding entries.
        entries: Vec<Entry<K, V>>,
    },
}

// ---------------------------------------------------------------------------
// Bitmap helpers
// ---------------------------------------------------------------------------

/// Extracts the 5-bit hash fragment at the given bit-shift depth.
#[inline]
#[must_use]
pub const fn fragment(hash: u64, shift: u32) -> u32 {
    ((hash >> shift) & 0x1F) as u32
}

/// Returns the single-bit mask for the given fragment (0..31).
#[inline]
#[must_use]
pub const fn mask(frag: u32) -> u32 {
    1 << frag
}

/// Returns the compact index of `bit` within `bitmap`: the population
/// count of the bitmap below `bit`.
#[inline]
#[must_use]
pub const fn index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// ---------------------------------------------------------------------------
// Array-splice helpers
// ---------------------------------------------------------------------------

/// Returns a copy of `items` with `item` replacing the element at `at`.
#[must_use]
pub fn replaced_at<T: Clone>(items: &[T], at: usize, item: T) -> Vec<T> {
    let mut out = items.to_vec();
    out[at] = item;
    out
}

/// Returns a copy of `items` with `item` inserted at `at`.
#[must_use]
pub fn inserted_at<T: Clone>(items: &[T], at: usize, item: T) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len() + 1);
    out.extend_from_slice(&items[..at]);
    out.push(item);
    out.extend_from_slice(&items[at..]);
    out
}

/// Returns a copy of `items` without the element at `at`.
#[must_use]
pub fn removed_at<T: Clone>(items: &[T], at: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len() - 1);
    out.extend_from_slice(&items[..at]);
    out.extend_from_slice(&items[at + 1..]);
    out
}

// ---------------------------------------------------------------------------
// Node accessors & constructors
// ---------------------------------------------------------------------------

impl<K, V> Node<K, V> {
    /// Builds an inner node holding a single entry, positioned for `shift`.
    #[must_use]
    pub fn single(entry: Entry<K, V>, shift: u32) -> Self {
        let bit = mask(fragment(entry.hash, shift));
        Self::Inner {
            data_map: bit,
            node_map: 0,
            entries: vec![entry],
            children: Vec::new(),
        }
    }

    /// Returns the number of inline data entries.
    #[must_use]
    pub fn data_len(&self) -> usize {
        match self {
            Self::Inner { entries, .. } | Self::Collision { entries, .. } => entries.len(),
        }
    }

    /// Returns the number of child subtrees (always 0 for collision nodes).
    #[must_use]
    pub fn children_len(&self) -> usize {
        match self {
            Self::Inner { children, .. } => children.len(),
            Self::Collision { .. } => 0,
        }
    }
}

impl<K, V> fmt::Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner {
                data_map, node_map, ..
            } => f
                .debug_struct("Inner")
                .field("data_map", &format_args!("{data_map:#034b}"))
                .field("node_map", &format_args!("{node_map:#034b}"))
                .finish_non_exhaustive(),
            Self::Collision { hash, entries } => f
                .debug_struct("Collision")
                .field("hash", hash)
                .field("entries_len", &entries.len())
                .finish_non_exhaustive(),
        }
    }
}
