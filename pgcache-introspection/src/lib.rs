//! The introspection surface's data layer (spec.md §4.6): a listable
//! directory of registered caches keyed by `(database, table, binding
//! key)`, each reporting its key-signature string (spec.md §6), current
//! size, an optional value-lookup by key path, and an optional reload
//! action. This crate owns the catalog only — a host wires it into its own
//! HTTP router (spec.md §1 excludes the HTTP endpoints themselves).
#![deny(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

pub use pgcache_util::keypath::{KeyKind, KeyPathError, KeyValue};

/// A reloadable cache, implemented by `pgcache_client::Table` (re-running
/// its `loadSql`).
#[async_trait]
pub trait Reloadable: Send + Sync {
    /// Re-run the full reload (spec.md §4.6: "Reloadable caches expose a
    /// reload action").
    async fn reload(&self) -> pgcache_errors::Result<()>;
}

#[async_trait]
impl<R, S> Reloadable for pgcache_client::Table<R, S>
where
    R: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    S: pgcache_client::RowSource + 'static,
{
    async fn reload(&self) -> pgcache_errors::Result<()> {
        self.init().await
    }
}

/// One registered binding's entry in the directory.
pub struct Entry {
    database: String,
    table: String,
    key: String,
    key_kinds: Vec<KeyKind>,
    size: Box<dyn Fn() -> usize + Send + Sync>,
    lookup: Option<Box<dyn Fn(&[KeyValue]) -> Option<Value> + Send + Sync>>,
    reloadable: Option<Arc<dyn Reloadable>>,
}

impl Entry {
    /// Build an entry. `key` is the printable signature from
    /// `pgcache_data::Signature::format` (spec.md §6). `key_kinds` gives the
    /// expected type of each key-path segment, in order, for
    /// [`Registry::lookup`]; pass an empty slice for a binding with no
    /// navigable keys (a top-level sorted set).
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        key: impl Into<String>,
        key_kinds: Vec<KeyKind>,
        size: impl Fn() -> usize + Send + Sync + 'static,
    ) -> Self {
        Entry {
            database: database.into(),
            table: table.into(),
            key: key.into(),
            key_kinds,
            size: Box::new(size),
            lookup: None,
            reloadable: None,
        }
    }

    /// Attach a value-lookup walking this entry's container by key path.
    pub fn with_lookup(mut self, lookup: impl Fn(&[KeyValue]) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.lookup = Some(Box::new(lookup));
        self
    }

    /// Attach a reload action (spec.md §4.6).
    pub fn with_reload(mut self, reloadable: Arc<dyn Reloadable>) -> Self {
        self.reloadable = Some(reloadable);
        self
    }
}

/// A point-in-time summary of one entry, as returned by [`Registry::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// The database the binding belongs to.
    pub database: String,
    /// The table the binding belongs to.
    pub table: String,
    /// The container-key signature string (spec.md §6).
    pub key: String,
    /// The binding's current entry count.
    pub size: usize,
    /// Whether this entry supports a key-path value lookup.
    pub lookupable: bool,
    /// Whether this entry supports a reload action.
    pub reloadable: bool,
}

fn entry_id(database: &str, table: &str, key: &str) -> (String, String, String) {
    (database.to_string(), table.to_string(), key.to_string())
}

/// The directory of registered caches.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<(String, String, String), Entry>>,
}

impl Registry {
    /// An empty directory.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register (or replace) an entry.
    pub fn register(&self, entry: Entry) {
        let id = entry_id(&entry.database, &entry.table, &entry.key);
        self.entries.write().insert(id, entry);
    }

    /// Remove an entry, if present.
    pub fn unregister(&self, database: &str, table: &str, key: &str) {
        self.entries.write().remove(&entry_id(database, table, key));
    }

    /// List every registered entry with its current size (spec.md §4.6:
    /// "a listable directory").
    pub fn list(&self) -> Vec<Summary> {
        self.entries
            .read()
            .values()
            .map(|e| Summary {
                database: e.database.clone(),
                table: e.table.clone(),
                key: e.key.clone(),
                size: (e.size)(),
                lookupable: e.lookup.is_some(),
                reloadable: e.reloadable.is_some(),
            })
            .collect()
    }

    /// Current size of one entry.
    pub fn size(&self, database: &str, table: &str, key: &str) -> Option<usize> {
        self.entries.read().get(&entry_id(database, table, key)).map(|e| (e.size)())
    }

    /// Walk one entry's container by a comma-separated key path, converting
    /// each segment to the entry's expected key kind (spec.md §4.6).
    /// Returns `None` if no such entry exists or it has no lookup
    /// configured; `Some(Err(_))` if a segment doesn't parse; otherwise the
    /// looked-up value (`None` inside the `Ok` when the path isn't present).
    pub fn lookup(&self, database: &str, table: &str, key: &str, path: &str) -> Option<Result<Option<Value>, KeyPathError>> {
        let entries = self.entries.read();
        let entry = entries.get(&entry_id(database, table, key))?;
        let lookup = entry.lookup.as_ref()?;
        let keys = match pgcache_util::keypath::parse_path(&entry.key_kinds, path) {
            Ok(keys) => keys,
            Err(err) => return Some(Err(err)),
        };
        Some(Ok(lookup(&keys)))
    }

    /// Trigger a reload for one entry, if it's reloadable.
    pub async fn reload(&self, database: &str, table: &str, key: &str) -> Option<pgcache_errors::Result<()>> {
        let reloadable = {
            let entries = self.entries.read();
            entries.get(&entry_id(database, table, key))?.reloadable.clone()
        }?;
        Some(reloadable.reload().await)
    }
}
