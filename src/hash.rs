//! Key/value hashing and the `AdHash` structural fold.
//!
//! The map hash is the commutative sum `φ(S) = Σ f(k, v)` over all entries,
//! maintained incrementally with wrapping deltas on every mutation. Two
//! mixing seeds keep the fold from degenerating when `hash(v) = 0`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Mixing seed for key hashes (golden ratio constant).
const KEY_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Mixing seed for value hashes (large prime).
const VALUE_SEED: u64 = 0x517C_C1B7_2722_0A95;

/// Computes the 64-bit hash of a value with the standard hasher.
///
/// `DefaultHasher::new()` is deterministic within a process, so equal maps
/// always carry equal `AdHash` values regardless of insertion order.
#[must_use]
pub fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Computes the `AdHash` contribution of a single entry.
///
/// `f(k, v) = key_hash · KEY_SEED ⊕ value_hash · VALUE_SEED`
#[must_use]
pub const fn entry_contribution(key_hash: u64, value_hash: u64) -> u64 {
    key_hash
        .wrapping_mul(KEY_SEED)
        .wrapping_add(value_hash.wrapping_mul(VALUE_SEED))
}
