use crate::{Change, TrieMap};

fn map_of(pairs: &[(&'static str, i32)]) -> TrieMap<&'static str, i32> {
    pairs.iter().copied().collect()
}

#[test]
fn union_prefers_receiver() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("b", 99), ("c", 3)]);
    let merged = left.union(&right);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get(&"b"), Some(&2));
    assert_eq!(merged.get(&"c"), Some(&3));
}

#[test]
fn union_with_combines_conflicts() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("b", 10), ("c", 3)]);
    let merged = left.union_with(&right, |_, ours, theirs| ours + theirs);

    assert_eq!(merged.get(&"b"), Some(&12));
    assert_eq!(merged.get(&"a"), Some(&1));
    assert_eq!(merged.get(&"c"), Some(&3));
}

#[test]
fn intersect_keeps_receiver_values() {
    let left = map_of(&[("a", 1), ("b", 2), ("c", 3)]);
    let right = map_of(&[("b", 99), ("c", 99), ("d", 99)]);
    let both = left.intersect(&right);

    assert_eq!(both.len(), 2);
    assert_eq!(both.get(&"b"), Some(&2));
    assert_eq!(both.get(&"a"), None);
}

#[test]
fn intersect_with_map_reconciles_types() {
    let counts = map_of(&[("a", 2), ("b", 3)]);
    let labels: TrieMap<&str, String> =
        vec![("b", "bee".to_string()), ("c", "sea".to_string())]
            .into_iter()
            .collect();
    let joined = counts.intersect_with_map(&labels, |_, n, label| format!("{label}x{n}"));

    assert_eq!(joined.len(), 1);
    assert_eq!(joined.get(&"b"), Some(&"beex3".to_string()));
}

#[test]
fn except_removes_other_keys() {
    let left = map_of(&[("a", 1), ("b", 2), ("c", 3)]);
    let right = map_of(&[("b", 0)]);
    let rest = left.except(&right);

    assert_eq!(rest.len(), 2);
    assert!(!rest.contains_key(&"b"));
}

#[test]
fn symmetric_except_keeps_exclusive_keys() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("b", 99), ("c", 3)]);
    let exclusive = left.symmetric_except(&right);

    assert_eq!(exclusive.len(), 2);
    assert_eq!(exclusive.get(&"a"), Some(&1));
    assert_eq!(exclusive.get(&"c"), Some(&3));
    assert!(!exclusive.contains_key(&"b"));
}

#[test]
fn count_invariant_across_algebra() {
    let left: TrieMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
    let right: TrieMap<u32, u32> = (25..75).map(|i| (i, i)).collect();

    let union = left.union(&right);
    let intersect = left.intersect(&right);
    let except = left.except(&right);
    let symmetric = left.symmetric_except(&right);

    assert_eq!(union.len(), union.iter().count());
    assert_eq!(union.len(), 75);
    assert_eq!(intersect.len(), 25);
    assert_eq!(except.len(), 25);
    assert_eq!(symmetric.len(), 50);
}

#[test]
fn union_log_reports_adopted_keys() {
    let left = map_of(&[("a", 1)]);
    let right = map_of(&[("a", 9), ("b", 2)]);
    let (merged, log) = left.union_with_log(&right);

    assert_eq!(merged.len(), 2);
    // "a" kept the receiver's value: no change recorded.
    assert_eq!(log.len(), 1);
    assert_eq!(log.get(&"b"), Some(&Change::Added(2)));
}

#[test]
fn except_log_reports_dropped_keys() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("a", 0)]);
    let (rest, log) = left.except_with_log(&right);

    assert_eq!(rest.len(), 1);
    assert_eq!(log.len(), 1);
    assert_eq!(log.get(&"a"), Some(&Change::Removed(1)));
}

#[test]
fn intersect_log_reports_dropped_keys() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("b", 5)]);
    let (both, log) = left.intersect_with_log(&right);

    assert_eq!(both.len(), 1);
    assert_eq!(log.get(&"a"), Some(&Change::Removed(1)));
}

#[test]
fn symmetric_except_log_mixes_directions() {
    let left = map_of(&[("a", 1), ("b", 2)]);
    let right = map_of(&[("b", 99), ("c", 3)]);
    let (_, log) = left.symmetric_except_with_log(&right);

    assert_eq!(log.len(), 2);
    assert_eq!(log.get(&"b"), Some(&Change::Removed(2)));
    assert_eq!(log.get(&"c"), Some(&Change::Added(3)));
}
