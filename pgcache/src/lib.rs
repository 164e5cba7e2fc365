//! In-process, read-optimized caches kept in sync with a PostgreSQL
//! database via LISTEN/NOTIFY triggers. This crate wires together the
//! projection engine ([`pgcache_data`]), the table coordinator
//! ([`pgcache_client`]), the trigger/notification listener
//! ([`pgcache_listener`]), and the introspection directory
//! ([`pgcache_introspection`]) behind one entry point, [`PgCache`].
#![deny(missing_docs)]

use std::sync::Arc;

pub use pgcache_client::{decode, BigColumns, RowSource, Table, TableEvent};
pub use pgcache_data::{Binding, Hooks, Projection, Signature};
pub use pgcache_errors::{BindingError, DeserializeError, Error, ReloadError, Result, SetupError};
pub use pgcache_introspection::{Entry, KeyKind, KeyPathError, KeyValue, Reloadable, Registry, Summary};
pub use pgcache_listener::{Dispatch, Listener, ListenerConfig, TableState};

/// The top-level handle an application holds: one [`Listener`] (one
/// database connection pair) plus the [`Registry`] its tables' entries are
/// published to.
pub struct PgCache {
    /// The change listener for this database.
    pub listener: Arc<Listener>,
    /// The introspection directory for caches registered against this
    /// database.
    pub registry: Arc<Registry>,
}

impl PgCache {
    /// Connect to `pg_config` with [`ListenerConfig::default`] and start the
    /// receive loop. The returned [`PgCache`] has an empty [`Registry`];
    /// register each table's coordinator with [`PgCache::add_table`] and, if
    /// it should be introspectable, with [`Registry::register`] directly.
    pub async fn connect(pg_config: tokio_postgres::Config) -> Result<Self> {
        PgCache::connect_with(pg_config, ListenerConfig::default()).await
    }

    /// Like [`PgCache::connect`], with an explicit [`ListenerConfig`].
    pub async fn connect_with(pg_config: tokio_postgres::Config, config: ListenerConfig) -> Result<Self> {
        let listener = Listener::connect_with(pg_config, config).await?;
        Ok(PgCache {
            listener,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Subscribe `table`'s coordinator to change notifications (spec.md
    /// §4.4). `coordinator` is also usable as a [`Reloadable`] for
    /// [`Entry::with_reload`], since `Table` implements both traits.
    pub async fn add_table<R, S>(&self, table: &str, columns_to_notify: &[&str], columns_to_check: &[&str], coordinator: Arc<Table<R, S>>) -> Result<()>
    where
        R: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
        S: RowSource + 'static,
    {
        self.listener.add_table(table, columns_to_notify, columns_to_check, coordinator).await
    }
}
