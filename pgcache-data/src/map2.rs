//! The two-level nested map target shape: `keyFields` has exactly two
//! entries (spec.md §3/§4.1, §8 S4). Intermediate mapping layers are
//! created on demand during save and are never removed on remove (spec.md
//! §3 bullet 1: "inner layers that drain to empty after remove are left
//! in place").

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use pgcache_errors::BindingError;

use crate::hooks::Hooks;
use crate::{Binding, Projection, Signature};

/// A binding whose target is
/// `Arc<RwLock<HashMap<K1, HashMap<K2, V>>>>`.
pub struct Map2Binding<R, K1, K2, V> {
    target: Arc<RwLock<HashMap<K1, HashMap<K2, V>>>>,
    key1_fn: Box<dyn Fn(&R) -> K1 + Send + Sync>,
    key2_fn: Box<dyn Fn(&R) -> K2 + Send + Sync>,
    value_fn: Box<dyn Fn(&R) -> V + Send + Sync>,
    hooks: Hooks<R>,
}

impl<R, K1, K2, V> Projection<R> for Map2Binding<R, K1, K2, V>
where
    R: Clone + Send + Sync,
    K1: Eq + Hash + Clone + Send + Sync,
    K2: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn save(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let k1 = (self.key1_fn)(&local);
        let k2 = (self.key2_fn)(&local);
        let value = (self.value_fn)(&local);
        self.target.write().entry(k1).or_default().insert(k2, value);
    }

    fn remove(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let k1 = (self.key1_fn)(&local);
        let k2 = (self.key2_fn)(&local);
        let mut outer = self.target.write();
        if let Some(inner) = outer.get_mut(&k1) {
            inner.remove(&k2);
        }
    }

    fn clear(&self) {
        self.target.write().clear();
    }

    fn len(&self) -> usize {
        self.target.read().values().map(|inner| inner.len()).sum()
    }
}

/// A binding whose target is
/// `Arc<RwLock<HashMap<K1, HashMap<K2, Vec<V>>>>>` (spec.md §8 S4).
///
/// When a terminal sorted set drains to empty, whether the `K2` entry is
/// deleted or left pointing at an empty `Vec` is the behavior spec.md §9
/// leaves ambiguous ("the source mixes two generations of APIs … whether
/// this is intentional or a leak is unclear"). This binding defaults to
/// *retaining* the empty entry, matching spec.md §8 S4's documented
/// output; pass `prune_empty_terminal: true` to delete it instead.
pub struct Map2SortedSetBinding<R, K1, K2, V, UK> {
    target: Arc<RwLock<HashMap<K1, HashMap<K2, Vec<V>>>>>,
    key1_fn: Box<dyn Fn(&R) -> K1 + Send + Sync>,
    key2_fn: Box<dyn Fn(&R) -> K2 + Send + Sync>,
    value_fn: Box<dyn Fn(&R) -> V + Send + Sync>,
    unique_key_fn: Box<dyn Fn(&V) -> UK + Send + Sync>,
    hooks: Hooks<R>,
    prune_empty_terminal: bool,
}

impl<R, K1, K2, V, UK> Projection<R> for Map2SortedSetBinding<R, K1, K2, V, UK>
where
    R: Clone + Send + Sync,
    K1: Eq + Hash + Clone + Send + Sync,
    K2: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
    UK: Ord + Send + Sync,
{
    fn save(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let k1 = (self.key1_fn)(&local);
        let k2 = (self.key2_fn)(&local);
        let value = (self.value_fn)(&local);
        let mut outer = self.target.write();
        let inner = outer.entry(k1).or_default();
        let seq = inner.remove(&k2).unwrap_or_default();
        inner.insert(k2, sorted_set::save(seq, value, |v| (self.unique_key_fn)(v)));
    }

    fn remove(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let k1 = (self.key1_fn)(&local);
        let k2 = (self.key2_fn)(&local);
        let value = (self.value_fn)(&local);
        let mut outer = self.target.write();
        let Some(inner) = outer.get_mut(&k1) else {
            return;
        };
        let Some(seq) = inner.remove(&k2) else {
            return;
        };
        let seq = sorted_set::remove(seq, &value, |v| (self.unique_key_fn)(v));
        if !seq.is_empty() || !self.prune_empty_terminal {
            inner.insert(k2, seq);
        }
    }

    fn clear(&self) {
        self.target.write().clear();
    }

    fn len(&self) -> usize {
        self.target
            .read()
            .values()
            .flat_map(|inner| inner.values())
            .map(Vec::len)
            .sum()
    }
}

impl<R> Binding<R> {
    /// Build a binding targeting `HashMap<K1, HashMap<K2, V>>`.
    #[allow(clippy::too_many_arguments)]
    pub fn map2<K1, K2, V>(
        table: impl Into<String>,
        target: Option<Arc<RwLock<HashMap<K1, HashMap<K2, V>>>>>,
        key1_field: &'static str,
        key1_fn: impl Fn(&R) -> K1 + Send + Sync + 'static,
        key2_field: &'static str,
        key2_fn: impl Fn(&R) -> K2 + Send + Sync + 'static,
        value_field: Option<&'static str>,
        value_fn: impl Fn(&R) -> V + Send + Sync + 'static,
        hooks: Hooks<R>,
    ) -> Result<Self, BindingError>
    where
        R: Clone + Send + Sync + 'static,
        K1: Eq + Hash + Clone + Send + Sync + 'static,
        K2: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let target = target.ok_or_else(|| BindingError::NullTarget {
            table: table.into(),
        })?;
        Ok(Binding::new(
            Signature {
                key_fields: vec![key1_field, key2_field],
                value_field,
                sorted_set: false,
            },
            Map2Binding {
                target,
                key1_fn: Box::new(key1_fn),
                key2_fn: Box::new(key2_fn),
                value_fn: Box::new(value_fn),
                hooks,
            },
        ))
    }

    /// Build a binding targeting `HashMap<K1, HashMap<K2, Vec<V>>>`. See
    /// [`Map2SortedSetBinding`] for `prune_empty_terminal`'s meaning.
    #[allow(clippy::too_many_arguments)]
    pub fn map2_sorted_set<K1, K2, V, UK>(
        table: impl Into<String>,
        target: Option<Arc<RwLock<HashMap<K1, HashMap<K2, Vec<V>>>>>>,
        key1_field: &'static str,
        key1_fn: impl Fn(&R) -> K1 + Send + Sync + 'static,
        key2_field: &'static str,
        key2_fn: impl Fn(&R) -> K2 + Send + Sync + 'static,
        value_field: Option<&'static str>,
        value_fn: impl Fn(&R) -> V + Send + Sync + 'static,
        unique_key_fn: impl Fn(&V) -> UK + Send + Sync + 'static,
        hooks: Hooks<R>,
        prune_empty_terminal: bool,
    ) -> Result<Self, BindingError>
    where
        R: Clone + Send + Sync + 'static,
        K1: Eq + Hash + Clone + Send + Sync + 'static,
        K2: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        UK: Ord + Send + Sync + 'static,
    {
        let target = target.ok_or_else(|| BindingError::NullTarget {
            table: table.into(),
        })?;
        Ok(Binding::new(
            Signature {
                key_fields: vec![key1_field, key2_field],
                value_field,
                sorted_set: true,
            },
            Map2SortedSetBinding {
                target,
                key1_fn: Box::new(key1_fn),
                key2_fn: Box::new(key2_fn),
                value_fn: Box::new(value_fn),
                unique_key_fn: Box::new(unique_key_fn),
                hooks,
                prune_empty_terminal,
            },
        ))
    }
}
