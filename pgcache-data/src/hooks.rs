//! The `preprocess`/`precond` gate shared by every binding kind
//! (spec.md §4.1 steps 1–2).

/// The optional `preprocess`/`precond` hooks configured on a binding.
///
/// `preprocess` runs first on a mutable, binding-local clone of the row
/// (so that one binding's preprocessing can never be observed by another
/// binding applying the same row — see DESIGN.md for why cloning was
/// chosen over sharing one mutable row across bindings). `precond` then
/// decides whether the operation proceeds at all.
pub struct Hooks<R> {
    preprocess: Option<Box<dyn Fn(&mut R) + Send + Sync>>,
    precond: Option<Box<dyn Fn(&R) -> bool + Send + Sync>>,
}

impl<R> Default for Hooks<R> {
    fn default() -> Self {
        Hooks {
            preprocess: None,
            precond: None,
        }
    }
}

impl<R> Hooks<R> {
    /// No hooks configured: every row is processed as-is.
    pub fn none() -> Self {
        Self::default()
    }

    /// Configure a `preprocess` hook.
    pub fn with_preprocess(mut self, f: impl Fn(&mut R) + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Box::new(f));
        self
    }

    /// Configure a `precond` hook.
    pub fn with_precond(mut self, f: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.precond = Some(Box::new(f));
        self
    }

    /// Run `preprocess` (if any) on a clone of `row`, then evaluate
    /// `precond` (if any). Returns `None` when `precond` returns false
    /// (spec.md: "when false, the operation is skipped").
    pub fn apply(&self, row: &R) -> Option<R>
    where
        R: Clone,
    {
        let mut local = row.clone();
        if let Some(preprocess) = &self.preprocess {
            preprocess(&mut local);
        }
        if let Some(precond) = &self.precond {
            if !precond(&local) {
                return None;
            }
        }
        Some(local)
    }
}
