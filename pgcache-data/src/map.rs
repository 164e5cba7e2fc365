//! The single-level map target shape: `keyFields` has exactly one entry
//! (spec.md §3/§4.1). Two terminal kinds: a scalar value
//! (`HashMap<K, V>`, [`MapBinding`]) and a sorted set
//! (`HashMap<K, Vec<V>>`, [`MapSortedSetBinding`]).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use pgcache_errors::BindingError;

use crate::hooks::Hooks;
use crate::{Binding, Projection, Signature};

/// A binding whose target is `Arc<RwLock<HashMap<K, V>>>` (spec.md §8 S1).
pub struct MapBinding<R, K, V> {
    target: Arc<RwLock<HashMap<K, V>>>,
    key_fn: Box<dyn Fn(&R) -> K + Send + Sync>,
    value_fn: Box<dyn Fn(&R) -> V + Send + Sync>,
    hooks: Hooks<R>,
}

impl<R, K, V> Projection<R> for MapBinding<R, K, V>
where
    R: Clone + Send + Sync,
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn save(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let key = (self.key_fn)(&local);
        let value = (self.value_fn)(&local);
        self.target.write().insert(key, value);
    }

    fn remove(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let key = (self.key_fn)(&local);
        self.target.write().remove(&key);
    }

    fn clear(&self) {
        self.target.write().clear();
    }

    fn len(&self) -> usize {
        self.target.read().len()
    }
}

/// A binding whose target is `Arc<RwLock<HashMap<K, Vec<V>>>>` (spec.md
/// §8 S2/S3). When the sorted set under a key drains to empty after a
/// remove, the key is deleted from the map entirely (spec.md §3: "A
/// terminal sorted set that becomes empty after a remove is deleted from
/// its parent mapping key" — unambiguous at this depth, confirmed by S3).
pub struct MapSortedSetBinding<R, K, V, UK> {
    target: Arc<RwLock<HashMap<K, Vec<V>>>>,
    key_fn: Box<dyn Fn(&R) -> K + Send + Sync>,
    value_fn: Box<dyn Fn(&R) -> V + Send + Sync>,
    unique_key_fn: Box<dyn Fn(&V) -> UK + Send + Sync>,
    hooks: Hooks<R>,
}

impl<R, K, V, UK> Projection<R> for MapSortedSetBinding<R, K, V, UK>
where
    R: Clone + Send + Sync,
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
    UK: Ord + Send + Sync,
{
    fn save(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let key = (self.key_fn)(&local);
        let value = (self.value_fn)(&local);
        let mut guard = self.target.write();
        let seq = guard.remove(&key).unwrap_or_default();
        guard.insert(key, sorted_set::save(seq, value, |v| (self.unique_key_fn)(v)));
    }

    fn remove(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let key = (self.key_fn)(&local);
        let value = (self.value_fn)(&local);
        let mut guard = self.target.write();
        let Some(seq) = guard.remove(&key) else {
            return;
        };
        let seq = sorted_set::remove(seq, &value, |v| (self.unique_key_fn)(v));
        if !seq.is_empty() {
            guard.insert(key, seq);
        }
    }

    fn clear(&self) {
        self.target.write().clear();
    }

    fn len(&self) -> usize {
        self.target.read().len()
    }
}

impl<R> Binding<R> {
    /// Build a binding targeting `HashMap<K, V>`, keyed by `key_fn`, with
    /// scalar values produced by `value_fn`.
    pub fn map<K, V>(
        table: impl Into<String>,
        target: Option<Arc<RwLock<HashMap<K, V>>>>,
        key_field: &'static str,
        key_fn: impl Fn(&R) -> K + Send + Sync + 'static,
        value_field: Option<&'static str>,
        value_fn: impl Fn(&R) -> V + Send + Sync + 'static,
        hooks: Hooks<R>,
    ) -> Result<Self, BindingError>
    where
        R: Clone + Send + Sync + 'static,
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let target = target.ok_or_else(|| BindingError::NullTarget {
            table: table.into(),
        })?;
        Ok(Binding::new(
            Signature {
                key_fields: vec![key_field],
                value_field,
                sorted_set: false,
            },
            MapBinding {
                target,
                key_fn: Box::new(key_fn),
                value_fn: Box::new(value_fn),
                hooks,
            },
        ))
    }

    /// Build a binding targeting `HashMap<K, Vec<V>>`, keyed by `key_fn`,
    /// with the inner sequence kept as a sorted set under `unique_key_fn`.
    pub fn map_sorted_set<K, V, UK>(
        table: impl Into<String>,
        target: Option<Arc<RwLock<HashMap<K, Vec<V>>>>>,
        key_field: &'static str,
        key_fn: impl Fn(&R) -> K + Send + Sync + 'static,
        value_field: Option<&'static str>,
        value_fn: impl Fn(&R) -> V + Send + Sync + 'static,
        unique_key_fn: impl Fn(&V) -> UK + Send + Sync + 'static,
        hooks: Hooks<R>,
    ) -> Result<Self, BindingError>
    where
        R: Clone + Send + Sync + 'static,
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        UK: Ord + Send + Sync + 'static,
    {
        let target = target.ok_or_else(|| BindingError::NullTarget {
            table: table.into(),
        })?;
        Ok(Binding::new(
            Signature {
                key_fields: vec![key_field],
                value_field,
                sorted_set: true,
            },
            MapSortedSetBinding {
                target,
                key_fn: Box::new(key_fn),
                value_fn: Box::new(value_fn),
                unique_key_fn: Box::new(unique_key_fn),
                hooks,
            },
        ))
    }
}
