//! Lock-free atomic cell over [`TrieMap`] snapshots.

#![allow(unsafe_code)]

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_epoch::{self as epoch, Atomic, Owned};
use crossbeam_utils::Backoff;

use crate::change::{self, Change, ChangeEvent, Patch, ValueEq};
use crate::tracked::TrackedMap;
use crate::{TrieError, TrieMap, TrieMapBuilder};

/// Identifies a subscription handed out by [`AtomMap::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

type Subscriber<K, V> = Arc<dyn Fn(&ChangeEvent<K, V>) + Send + Sync>;

/// A thread-safe mutable cell holding one [`TrieMap`] snapshot.
///
/// Every mutation is a compare-and-swap retry loop: read the snapshot,
/// apply the pure operation, attempt to publish. Lost races recompute the
/// whole step against the fresh snapshot, so caller-supplied transforms
/// must be pure and cheap — they may run more than once under contention.
/// Retries are unbounded; under pathological write contention a single
/// call can spin indefinitely. Callers wanting bounded retry must wrap the
/// call externally.
///
/// Reads never block and always observe a fully published snapshot.
/// Replaced snapshots are reclaimed through the epoch collector once no
/// reader can still hold them.
///
/// A value-equality strategy fixed at construction decides whether a write
/// counts as a change: writing an equal value publishes nothing and
/// notifies nobody.
pub struct AtomMap<K: 'static, V: 'static> {
    slot: Atomic<TrieMap<K, V>>,
    eq: ValueEq<V>,
    subscribers: Mutex<Vec<(usize, Subscriber<K, V>)>>,
    next_subscriber: AtomicUsize,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<K: 'static, V: 'static> AtomMap<K, V> {
    /// Creates an empty cell, comparing values with `PartialEq`.
    #[must_use]
    pub fn new() -> Self
    where
        V: PartialEq + 'static,
    {
        Self::from_map(TrieMap::new())
    }

    /// Creates a cell seeded with `map`, comparing values with `PartialEq`.
    #[must_use]
    pub fn from_map(map: TrieMap<K, V>) -> Self
    where
        V: PartialEq + 'static,
    {
        Self::with_equality(map, |a: &V, b: &V| a == b)
    }

    /// Creates a cell seeded with `map` and an explicit value-equality
    /// strategy used to decide whether a write is a change.
    pub fn with_equality(map: TrieMap<K, V>, eq: impl Fn(&V, &V) -> bool + Send + Sync + 'static) -> Self {
        Self {
            slot: Atomic::new(map),
            eq: Arc::new(eq),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicUsize::new(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

impl<K: 'static, V: 'static> AtomMap<K, V> {
    /// Returns the current snapshot. O(1); the snapshot is a full persistent
    /// map, safe to hold indefinitely.
    #[must_use]
    pub fn snapshot(&self) -> TrieMap<K, V> {
        let guard = epoch::pin();
        let shared = self.slot.load(Ordering::Acquire, &guard);
        // SAFETY: the slot always holds a snapshot published by construction
        // or a successful CAS, and the pinned guard keeps it alive.
        unsafe { shared.deref() }.clone()
    }

    /// Returns the number of entries in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        let guard = epoch::pin();
        let shared = self.slot.load(Ordering::Acquire, &guard);
        // SAFETY: see `snapshot`.
        unsafe { shared.deref() }.len()
    }

    /// Returns `true` if the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq + 'static, V: 'static> AtomMap<K, V> {
    /// Returns a clone of the value under `key` in the current snapshot.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let shared = self.slot.load(Ordering::Acquire, &guard);
        // SAFETY: see `snapshot`.
        unsafe { shared.deref() }.get(key).cloned()
    }

    /// Returns `true` if the current snapshot contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        let guard = epoch::pin();
        let shared = self.slot.load(Ordering::Acquire, &guard);
        // SAFETY: see `snapshot`.
        unsafe { shared.deref() }.contains_key(key)
    }
}

// ---------------------------------------------------------------------------
// CAS core
// ---------------------------------------------------------------------------

impl<K: 'static, V: 'static> AtomMap<K, V> {
    /// The retry loop shared by every mutator.
    ///
    /// `compute` maps the current snapshot to `Ok(None)` (no-op: return the
    /// snapshot unchanged, publish nothing) or `Ok(Some((next, patch)))`.
    /// Errors abort immediately — contention cannot resolve them.
    fn update_slot<F>(&self, compute: F) -> Result<TrieMap<K, V>, TrieError>
    where
        F: Fn(&TrieMap<K, V>) -> Result<Option<(TrieMap<K, V>, Patch<K, V>)>, TrieError>,
    {
        let backoff = Backoff::new();
        let guard = epoch::pin();
        loop {
            let shared = self.slot.load(Ordering::Acquire, &guard);
            // SAFETY: the slot always holds a published snapshot and the
            // pinned guard keeps it alive across this iteration.
            let current = unsafe { shared.deref() };

            let Some((next, patch)) = compute(current)? else {
                return Ok(current.clone());
            };

            let previous = current.clone();
            let published = next.clone();
            match self.slot.compare_exchange(
                shared,
                Owned::new(next),
                Ordering::AcqRel,
                Ordering::Acquire,
                &guard,
            ) {
                Ok(_) => {
                    // SAFETY: the old snapshot is now unreachable from the
                    // slot; destruction is deferred until every pinned
                    // reader has moved past this epoch.
                    unsafe { guard.defer_destroy(shared) };
                    self.notify(&ChangeEvent {
                        previous,
                        current: published.clone(),
                        patch,
                    });
                    return Ok(published);
                }
                Err(_) => backoff.spin(),
            }
        }
    }

    fn notify(&self, event: &ChangeEvent<K, V>) {
        let subscribers: Vec<Subscriber<K, V>> = {
            let registry = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            registry.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        for subscriber in subscribers {
            subscriber(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

impl<K: Hash + Eq + Clone + 'static, V: Hash + Clone + 'static> AtomMap<K, V> {
    /// Strictly inserts a new key; returns the published snapshot.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] if the key is already present.
    pub fn add(&self, key: K, value: V) -> Result<TrieMap<K, V>, TrieError> {
        self.update_slot(|current| {
            let (next, change) = current.add_with_log(key.clone(), value.clone())?;
            Ok(Some((
                next,
                Patch::Single {
                    key: key.clone(),
                    change,
                },
            )))
        })
    }

    /// Inserts a new key; no-op if it is already present.
    pub fn try_add(&self, key: K, value: V) -> TrieMap<K, V> {
        self.run_total(|current| {
            let (next, change) = current.try_add_with_log(key.clone(), value.clone());
            change
                .has_changed()
                .then(|| (next, single(key.clone(), change)))
        })
    }

    /// Inserts or replaces; writing an equal value publishes nothing.
    pub fn add_or_update(&self, key: K, value: V) -> TrieMap<K, V> {
        self.run_total(|current| {
            let (next, change) =
                current.add_or_update_with_log_by(key.clone(), value.clone(), |a, b| {
                    (self.eq)(a, b)
                });
            change
                .has_changed()
                .then(|| (next, single(key.clone(), change)))
        })
    }

    /// Strictly replaces the value under an existing key; writing an equal
    /// value publishes nothing.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] if the key is missing.
    pub fn set_item(&self, key: K, value: V) -> Result<TrieMap<K, V>, TrieError> {
        self.update_slot(|current| {
            let (next, change) =
                current.set_item_with_log_by(key.clone(), value.clone(), |a, b| (self.eq)(a, b))?;
            Ok(change
                .has_changed()
                .then(|| (next, single(key.clone(), change))))
        })
    }

    /// Replaces the value under an existing key; no-op if it is missing or
    /// the value is equal.
    pub fn try_set_item(&self, key: K, value: V) -> TrieMap<K, V> {
        self.run_total(|current| {
            let (next, change) =
                current.try_set_item_with_log_by(key.clone(), value.clone(), |a, b| {
                    (self.eq)(a, b)
                });
            change
                .has_changed()
                .then(|| (next, single(key.clone(), change)))
        })
    }

    /// Removes a key; no-op if it is absent.
    pub fn remove(&self, key: &K) -> TrieMap<K, V> {
        self.run_total(|current| {
            let (next, change) = current.remove_with_log(key);
            change
                .has_changed()
                .then(|| (next, single(key.clone(), change)))
        })
    }

    /// Removes every entry, publishing one batch patch of
    /// [`Change::Removed`] records; no-op on an empty snapshot.
    pub fn clear(&self) -> TrieMap<K, V> {
        self.run_total(|current| {
            if current.is_empty() {
                return None;
            }
            let mut log = TrieMapBuilder::new();
            for (key, value) in current {
                log.insert(key.clone(), Change::Removed(value.clone()));
            }
            Some((TrieMap::new(), Patch::Batch(log.freeze())))
        })
    }

    /// Inserts or replaces every pair as one atomic step, publishing a
    /// batch patch of the net changes.
    pub fn add_or_update_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> TrieMap<K, V> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        self.run_total(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for (key, value) in &pairs {
                let (next, change) = map.add_or_update_with_log_by(
                    key.clone(),
                    value.clone(),
                    |a, b| (self.eq)(a, b),
                );
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            (!log.is_empty()).then(|| (map, Patch::Batch(log)))
        })
    }

    /// Removes every key as one atomic step, publishing a batch patch.
    pub fn remove_range(&self, keys: impl IntoIterator<Item = K>) -> TrieMap<K, V> {
        let keys: Vec<K> = keys.into_iter().collect();
        self.run_total(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for key in &keys {
                let (next, change) = map.remove_with_log(key);
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            (!log.is_empty()).then(|| (map, Patch::Batch(log)))
        })
    }

    /// Strictly adds every pair as one atomic step.
    ///
    /// # Errors
    ///
    /// [`TrieError::DuplicateKey`] on the first already-present key; the
    /// snapshot is left untouched.
    pub fn add_range(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<TrieMap<K, V>, TrieError> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        self.update_slot(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for (key, value) in &pairs {
                let (next, change) = map.add_with_log(key.clone(), value.clone())?;
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            Ok((!log.is_empty()).then(|| (map, Patch::Batch(log))))
        })
    }

    /// Adds every pair whose key is absent, as one atomic step.
    pub fn try_add_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> TrieMap<K, V> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        self.run_total(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for (key, value) in &pairs {
                let (next, change) = map.try_add_with_log(key.clone(), value.clone());
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            (!log.is_empty()).then(|| (map, Patch::Batch(log)))
        })
    }

    /// Strictly replaces the value under every pair's key, as one atomic
    /// step.
    ///
    /// # Errors
    ///
    /// [`TrieError::KeyNotFound`] on the first missing key; the snapshot is
    /// left untouched.
    pub fn set_range(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<TrieMap<K, V>, TrieError> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        self.update_slot(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for (key, value) in &pairs {
                let (next, change) =
                    map.set_item_with_log_by(key.clone(), value.clone(), |a, b| (self.eq)(a, b))?;
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            Ok((!log.is_empty()).then(|| (map, Patch::Batch(log))))
        })
    }

    /// Keeps only the entries satisfying `pred`, publishing one batch patch
    /// of the dropped keys.
    pub fn filter(&self, pred: impl Fn(&K, &V) -> bool) -> TrieMap<K, V> {
        self.run_total(|current| {
            let (map, log) = current.filter_with_log(&pred);
            (!log.is_empty()).then(|| (map, Patch::Batch(log)))
        })
    }

    /// Adopts every key of `other` that is absent from the snapshot, as one
    /// atomic step.
    pub fn union(&self, other: &TrieMap<K, V>) -> TrieMap<K, V> {
        self.run_total(|current| {
            let mut map = current.clone();
            let mut log = TrieMap::new();
            for (key, value) in other {
                let (next, change) = map.try_add_with_log(key.clone(), value.clone());
                map = next;
                log = change::record(&log, key.clone(), change, &*self.eq);
            }
            (!log.is_empty()).then(|| (map, Patch::Batch(log)))
        })
    }

    /// Drops every key present in `other`, as one atomic step.
    pub fn except(&self, other: &TrieMap<K, V>) -> TrieMap<K, V> {
        self.filter(|key, _| !other.contains_key(key))
    }

    /// Drops every key absent from `other`, as one atomic step.
    pub fn intersect(&self, other: &TrieMap<K, V>) -> TrieMap<K, V> {
        self.filter(|key, _| other.contains_key(key))
    }

    /// Applies an arbitrary composition of pure map operations as one
    /// atomic transaction.
    ///
    /// `transform` receives a change-tracking view of the current snapshot;
    /// the net per-key changes are published as a batch patch. It may be
    /// invoked multiple times under contention and must be side-effect-free.
    pub fn swap(&self, transform: impl Fn(TrackedMap<K, V>) -> TrackedMap<K, V>) -> TrieMap<K, V> {
        self.run_total(|current| {
            let view = TrackedMap::with_eq(current.clone(), Arc::clone(&self.eq));
            let out = transform(view);
            if !out.has_changes() {
                return None;
            }
            let (map, log) = out.into_parts();
            Some((map, Patch::Batch(log)))
        })
    }

    /// [`swap`](Self::swap) for transforms that use the strict operations.
    ///
    /// # Errors
    ///
    /// Whatever the transform returns; errors abort without retrying.
    pub fn try_swap(
        &self,
        transform: impl Fn(TrackedMap<K, V>) -> Result<TrackedMap<K, V>, TrieError>,
    ) -> Result<TrieMap<K, V>, TrieError> {
        self.update_slot(|current| {
            let view = TrackedMap::with_eq(current.clone(), Arc::clone(&self.eq));
            let out = transform(view)?;
            if !out.has_changes() {
                return Ok(None);
            }
            let (map, log) = out.into_parts();
            Ok(Some((map, Patch::Batch(log))))
        })
    }

    /// Runs a total (never-failing) compute through the retry loop.
    fn run_total<F>(&self, compute: F) -> TrieMap<K, V>
    where
        F: Fn(&TrieMap<K, V>) -> Option<(TrieMap<K, V>, Patch<K, V>)>,
    {
        let Ok(map) = self.update_slot(|current| Ok(compute(current))) else {
            unreachable!("total computes never fail")
        };
        map
    }
}

const fn single<K, V>(key: K, change: Change<V>) -> Patch<K, V> {
    Patch::Single { key, change }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

impl<K: 'static, V: 'static> AtomMap<K, V> {
    /// Registers a callback invoked after every successful publish with the
    /// replaced snapshot, the new snapshot, and the per-key patch.
    ///
    /// Delivery happens-after the publish, on the mutating thread; the
    /// callback may run concurrently with later operations on this cell.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&ChangeEvent<K, V>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(subscriber)));
        SubscriptionId(id)
    }

    /// Removes a previously registered callback. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(sid, _)| *sid != id.0);
    }
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl<K: 'static, V: PartialEq + 'static> Default for AtomMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: 'static, V: 'static> fmt::Debug for AtomMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomMap")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<K: 'static, V: 'static> Drop for AtomMap<K, V> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` proves no guard can still reach this slot, so
        // the final snapshot is dropped immediately instead of deferred.
        unsafe {
            let shared = self.slot.load(Ordering::Relaxed, epoch::unprotected());
            if !shared.is_null() {
                drop(shared.into_owned());
            }
        }
    }
}
