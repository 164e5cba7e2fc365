//! The sequence target shape: `keyFields` is empty and the binding's
//! whole container is a sorted set of `V` (spec.md §3: "target is a
//! sorted sequence").

use std::sync::Arc;

use parking_lot::RwLock;
use pgcache_errors::BindingError;

use crate::hooks::Hooks;
use crate::{Binding, Projection, Signature};

/// A binding whose target is `Arc<RwLock<Vec<V>>>`, kept as a sorted set
/// under `unique_key`.
pub struct SortedSetBinding<R, V, UK> {
    target: Arc<RwLock<Vec<V>>>,
    value_fn: Box<dyn Fn(&R) -> V + Send + Sync>,
    unique_key_fn: Box<dyn Fn(&V) -> UK + Send + Sync>,
    hooks: Hooks<R>,
}

impl<R, V, UK> Projection<R> for SortedSetBinding<R, V, UK>
where
    R: Clone + Send + Sync,
    V: Clone + Send + Sync,
    UK: Ord + Send + Sync,
{
    fn save(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let value = (self.value_fn)(&local);
        let mut guard = self.target.write();
        let seq = std::mem::take(&mut *guard);
        *guard = sorted_set::save(seq, value, |v| (self.unique_key_fn)(v));
    }

    fn remove(&self, row: &R) {
        let Some(local) = self.hooks.apply(row) else {
            return;
        };
        let value = (self.value_fn)(&local);
        let mut guard = self.target.write();
        let seq = std::mem::take(&mut *guard);
        *guard = sorted_set::remove(seq, &value, |v| (self.unique_key_fn)(v));
    }

    fn clear(&self) {
        *self.target.write() = Vec::new();
    }

    fn len(&self) -> usize {
        self.target.read().len()
    }
}

impl<R> Binding<R> {
    /// Build a binding targeting a top-level sorted set: `keyFields` is
    /// empty (spec.md §3), and every save/remove operates on `target`
    /// directly via `unique_key`.
    ///
    /// For a scalar-element sorted set (spec.md §8 S2), pass the identity
    /// function as `unique_key` (the element *is* its own uniqueness key,
    /// per spec.md §6: "Scalar V (empty U) is compared directly").
    pub fn sorted_set<V, UK>(
        table: impl Into<String>,
        target: Option<Arc<RwLock<Vec<V>>>>,
        value_fn: impl Fn(&R) -> V + Send + Sync + 'static,
        unique_key_fn: impl Fn(&V) -> UK + Send + Sync + 'static,
        hooks: Hooks<R>,
    ) -> Result<Self, BindingError>
    where
        R: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        UK: Ord + Send + Sync + 'static,
    {
        let target = target.ok_or_else(|| BindingError::NullTarget {
            table: table.into(),
        })?;
        Ok(Binding::new(
            Signature {
                key_fields: vec![],
                value_field: None,
                sorted_set: true,
            },
            SortedSetBinding {
                target,
                value_fn: Box::new(value_fn),
                unique_key_fn: Box::new(unique_key_fn),
                hooks,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::RwLock;

    use super::*;
    use crate::Hooks;

    #[test]
    fn flat_scalar_sorted_set() {
        let target = Arc::new(RwLock::new(Vec::<i64>::new()));
        let binding = Binding::sorted_set(
            "t",
            Some(target.clone()),
            |v: &i64| *v,
            |v: &i64| *v,
            Hooks::none(),
        )
        .unwrap();

        for v in [5, 1, 3, 1] {
            binding.save(&v);
        }
        assert_eq!(*target.read(), vec![1, 3, 5]);

        binding.remove(&3);
        assert_eq!(*target.read(), vec![1, 5]);

        binding.clear();
        assert!(target.read().is_empty());
    }
}
