//! Persistent hash map based on CHAMP, with a lock-free atomic cell.
//!
//! CHAMP (Compressed Hash-Array Mapped Prefix-tree) is a refined HAMT whose
//! nodes carry two bitmaps — one for inline entries, one for child subtrees —
//! so both compacted arrays stay gap-free and popcount-indexed.
//!
//! Two layers are exposed:
//!
//! - [`TrieMap`] — the persistent map. Every mutator takes `&self` and
//!   returns a new map; unmodified subtrees are shared by reference between
//!   the old and the new value. Each mutator has a `*_with_log` twin that
//!   also reports what happened to the touched key as a [`Change`].
//! - [`AtomMap`] — a thread-safe mutable cell over `TrieMap` snapshots.
//!   Mutations are compare-and-swap retry loops; successful publishes can
//!   notify subscribers with a structural patch.
//!
//! # Key properties
//!
//! - **Structural sharing**: cheap copy, path-copy on write
//! - **O(1) equality fast path**: via incrementally maintained `AdHash`
//! - **Lock-free concurrency**: a single epoch-reclaimed snapshot slot
//! - **Per-key change log**: `Added` / `Removed` / `Updated` diffs
//!
//! # References
//!
//! - Steindorfer & Vinju, 2015 — "Optimizing Hash-Array Mapped Tries
//!   for Fast and Lean Immutable JVM Collections", OOPSLA 2015
//! - Bagwell, 2001 — "Ideal Hash Trees"

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

use std::error;
use std::fmt;

pub mod change;
pub mod hash;
pub mod iter;
pub mod node;

mod algebra;
mod builder;
mod map;
mod map_sync;
mod ops;
mod tracked;

#[cfg(test)]
mod tests;

pub use builder::TrieMapBuilder;
pub use change::{Change, ChangeEvent, Patch, ValueEq};
pub use map::TrieMap;
pub use map_sync::{AtomMap, SubscriptionId};
pub use tracked::TrackedMap;

/// Error raised by the strict map operations.
///
/// These are programmer errors: contention can never resolve them, so
/// [`AtomMap`] propagates them out of its retry loop immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrieError {
    /// A strict `add` found the key already present.
    DuplicateKey,
    /// A strict `set_item` found no entry for the key.
    KeyNotFound,
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => f.write_str("key already present in map"),
            Self::KeyNotFound => f.write_str("key not found in map"),
        }
    }
}

impl error::Error for TrieError {}

/// Policy applied when bulk construction meets a key twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDuplicate {
    /// Fail the whole construction with [`TrieError::DuplicateKey`].
    Error,
    /// Later pairs win (the [`FromIterator`] behavior).
    Replace,
    /// Earlier pairs win; later duplicates are dropped.
    Ignore,
}
