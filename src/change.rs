//! Per-key change records and the patch types delivered to subscribers.

use std::sync::Arc;

use crate::TrieMap;

/// A value-equality strategy passed as data.
///
/// Threaded through every call that needs to decide value-sameness instead
/// of relying on a trait bound; the default strategy wraps `PartialEq`.
pub type ValueEq<V> = Arc<dyn Fn(&V, &V) -> bool + Send + Sync>;

/// What a mutation did to the value under one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change<V> {
    /// Nothing happened (no-op, or an equal value was written).
    Unchanged,
    /// The key was inserted with this value.
    Added(V),
    /// The key was removed; this was its value.
    Removed(V),
    /// The value under the key was replaced.
    Updated {
        /// Value before the mutation.
        old: V,
        /// Value after the mutation.
        new: V,
    },
}

impl<V> Change<V> {
    /// Returns `false` only for [`Change::Unchanged`].
    #[must_use]
    pub const fn has_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Composes two consecutive changes to the same key into their net
    /// effect, relative to the state before `self`.
    ///
    /// `eq` decides whether a round trip landed back on an equal value
    /// (for example `Removed` then `Added` of the same value).
    #[must_use]
    pub fn merge(self, next: Self, eq: &dyn Fn(&V, &V) -> bool) -> Self {
        match (self, next) {
            (prior, Self::Unchanged) => prior,
            (Self::Unchanged, change) => change,
            (Self::Added(_), Self::Added(new) | Self::Updated { new, .. }) => Self::Added(new),
            (Self::Added(_), Self::Removed(_)) => Self::Unchanged,
            (Self::Updated { old, .. } | Self::Removed(old), Self::Removed(_)) => {
                Self::Removed(old)
            }
            (
                Self::Updated { old, .. } | Self::Removed(old),
                Self::Added(new) | Self::Updated { new, .. },
            ) => {
                if eq(&old, &new) {
                    Self::Unchanged
                } else {
                    Self::Updated { old, new }
                }
            }
        }
    }
}

/// Folds `change` for `key` into a sparse diff map, merging with any prior
/// record and dropping the key when the net effect is no change.
pub(crate) fn record<K, V>(
    log: &TrieMap<K, Change<V>>,
    key: K,
    change: Change<V>,
    eq: &dyn Fn(&V, &V) -> bool,
) -> TrieMap<K, Change<V>>
where
    K: std::hash::Hash + Eq + Clone,
    V: std::hash::Hash + Clone,
{
    if !change.has_changed() {
        return log.clone();
    }
    let prior = log.get(&key).cloned().unwrap_or(Change::Unchanged);
    let merged = prior.merge(change, eq);
    if merged.has_changed() {
        log.add_or_update(key, merged)
    } else {
        log.remove(&key)
    }
}

/// The structural diff carried by one [`ChangeEvent`].
#[derive(Debug, Clone)]
pub enum Patch<K, V> {
    /// A single-key mutation.
    Single {
        /// The mutated key.
        key: K,
        /// What happened under it.
        change: Change<V>,
    },
    /// A multi-key mutation: one change per touched key, keyed like the
    /// primary map.
    Batch(TrieMap<K, Change<V>>),
}

/// Event delivered to [`AtomMap`](crate::AtomMap) subscribers after a
/// successful publish.
///
/// Delivery happens-after the publish; the subscriber may run concurrently
/// with the next operation on the same cell.
#[derive(Debug, Clone)]
pub struct ChangeEvent<K, V> {
    /// The snapshot that was replaced.
    pub previous: TrieMap<K, V>,
    /// The snapshot that was published.
    pub current: TrieMap<K, V>,
    /// The per-key difference between the two.
    pub patch: Patch<K, V>,
}
