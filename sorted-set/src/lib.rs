//! A generic ordered-sequence-with-unique-keys utility (spec.md §6, "the
//! generic sorted-set utility"). This crate implements only the contract
//! the rest of the workspace relies on — it is a leaf dependency, not a
//! general-purpose data structure library.
//!
//! Given a sequence `S`, a value `V`, and a key projection `key: V -> K`:
//!
//! * [`save`] replaces any element of `S` whose key equals `key(&value)`
//!   with `value`, or inserts it if none matches, keeping `S` sorted
//!   ascending by key.
//! * [`remove`] removes the element matching `key`, if any.
//!
//! A scalar element with no separate uniqueness key (spec.md's "empty U")
//! is handled by passing a key function that simply returns (or borrows)
//! the value itself, e.g. `|v: &i64| *v`.
//!
//! Both functions take the sequence by value and return a new one, matching
//! the "return a new sequence (value semantics)" contract callers rely on
//! to replace their stored copy atomically under a writer lock.

/// Insert or replace `value` into `seq`, keyed by `key`, keeping `seq`
/// sorted ascending by key.
///
/// ```
/// let seq = vec![(1, "a"), (3, "c")];
/// let seq = sorted_set::save(seq, (2, "b"), |e| e.0);
/// assert_eq!(seq, vec![(1, "a"), (2, "b"), (3, "c")]);
///
/// let seq = sorted_set::save(seq, (2, "B"), |e| e.0);
/// assert_eq!(seq, vec![(1, "a"), (2, "B"), (3, "c")]);
/// ```
pub fn save<V, K, F>(mut seq: Vec<V>, value: V, key: F) -> Vec<V>
where
    K: Ord,
    F: Fn(&V) -> K,
{
    let k = key(&value);
    match seq.binary_search_by_key(&k, &key) {
        Ok(idx) => seq[idx] = value,
        Err(idx) => seq.insert(idx, value),
    }
    seq
}

/// Remove the element of `seq` whose key equals `key(value)`, if any.
/// Returns the (possibly unchanged, possibly empty) sequence.
///
/// ```
/// let seq = vec![(1, "a"), (2, "b"), (3, "c")];
/// let seq = sorted_set::remove(seq, &(2, "b"), |e| e.0);
/// assert_eq!(seq, vec![(1, "a"), (3, "c")]);
/// ```
pub fn remove<V, K, F>(mut seq: Vec<V>, value: &V, key: F) -> Vec<V>
where
    K: Ord,
    F: Fn(&V) -> K,
{
    let k = key(value);
    if let Ok(idx) = seq.binary_search_by_key(&k, &key) {
        seq.remove(idx);
    }
    seq
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn scalar_sorted_set_contract() {
        // S2 from spec.md §8: duplicates suppressed, ascending order.
        let mut seq: Vec<i64> = Vec::new();
        for v in [98, 99, 90, 99, 91, 100, 99] {
            seq = save(seq, v, |v| *v);
        }
        assert_eq!(seq, vec![90, 91, 98, 99, 100]);
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Score {
        subject: &'static str,
        score: i64,
    }

    #[test]
    fn record_sorted_set_replaces_on_unique_key() {
        // S3 from spec.md §8.
        let mut seq: Vec<Score> = Vec::new();
        seq = save(
            seq,
            Score {
                subject: "语文",
                score: 98,
            },
            |s| s.subject,
        );
        seq = save(
            seq,
            Score {
                subject: "语文",
                score: 99,
            },
            |s| s.subject,
        );
        assert_eq!(
            seq,
            vec![Score {
                subject: "语文",
                score: 99,
            }]
        );
    }

    #[test]
    fn remove_drains_to_empty() {
        let seq = vec![1, 2, 3];
        let seq = remove(seq, &2, |v| *v);
        let seq = remove(seq, &1, |v| *v);
        let seq = remove(seq, &3, |v| *v);
        assert!(seq.is_empty());
    }

    #[test]
    fn remove_of_absent_is_noop() {
        let seq = vec![1, 2, 3];
        let after = remove(seq.clone(), &99, |v| *v);
        assert_eq!(seq, after);
    }

    #[proptest]
    fn always_sorted_after_save(#[strategy(proptest::collection::vec(any::<i64>(), 0..30))] values: Vec<i64>) {
        let mut seq = Vec::new();
        for v in values {
            seq = save(seq, v, |v| *v);
        }
        prop_assert!(seq.windows(2).all(|w| w[0] < w[1]));
    }

    #[proptest]
    fn distinct_count_matches_len(#[strategy(proptest::collection::vec(0i64..20, 0..40))] values: Vec<i64>) {
        use std::collections::BTreeSet;
        let mut seq = Vec::new();
        for &v in &values {
            seq = save(seq, v, |v| *v);
        }
        let distinct: BTreeSet<_> = values.into_iter().collect();
        prop_assert_eq!(seq.len(), distinct.len());
    }
}
