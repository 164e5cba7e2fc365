//! The per-table coordinator: event hooks invoked by the listener, strictly
//! serially, for one subscribed table (spec.md §4.3).

use std::sync::Arc;
use std::time::Instant;

use pgcache_data::{Binding, Projection};
use pgcache_errors::{ReloadError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::deserialize::decode;
use crate::row_source::RowSource;

/// The secondary `bigColumns` fetch configuration (spec.md §4.3: "if
/// `bigColumns` is configured, issue a secondary query using
/// `bigColumnsLoadKeys` to fill the remaining fields").
///
/// `query` builds the secondary SQL from the just-arrived `new` payload (the
/// columns it needs are whatever the caller's closure reads out of that
/// map); the single returned row is merged over `new` before the row is
/// decoded once, so `R` never has to reconstruct a default for the deferred
/// columns.
pub struct BigColumns<S> {
    query: Box<dyn Fn(&Map<String, Value>) -> String + Send + Sync>,
    _row_source: std::marker::PhantomData<S>,
}

impl<S: RowSource> BigColumns<S> {
    /// Build a `bigColumns` config from a closure producing the secondary
    /// query's SQL text from the primary notification payload.
    pub fn new(query: impl Fn(&Map<String, Value>) -> String + Send + Sync + 'static) -> Self {
        BigColumns {
            query: Box::new(query),
            _row_source: std::marker::PhantomData,
        }
    }
}

/// One notification dispatched to a [`Table`] by the listener (spec.md
/// §4.3/§4.4), in server-emission order.
pub enum TableEvent {
    /// A full reload: re-run `loadSql`, clear every binding, re-save.
    Init,
    /// A new row (`newJson` only).
    Create(Map<String, Value>),
    /// An existing row changed (`oldJson`, `newJson`).
    Update(Map<String, Value>, Map<String, Value>),
    /// A row was deleted (`oldJson` only).
    Delete(Map<String, Value>),
    /// The driver reported a connection loss sentinel.
    ConnLoss,
}

/// Coordinates one table's bindings: fans each change out to every
/// registered [`Binding`] and owns the `loadSql`/`bigColumns` reload path.
pub struct Table<R, S> {
    name: String,
    row_source: Arc<S>,
    load_sql: String,
    big_columns: Option<BigColumns<S>>,
    bindings: Vec<Binding<R>>,
}

impl<R, S> Table<R, S>
where
    R: DeserializeOwned + Clone + Send + Sync + 'static,
    S: RowSource,
{
    /// Build a coordinator for `name`, sourcing reload rows from
    /// `row_source` via `load_sql`.
    pub fn new(name: impl Into<String>, row_source: Arc<S>, load_sql: impl Into<String>, big_columns: Option<BigColumns<S>>) -> Self {
        Table {
            name: name.into(),
            row_source,
            load_sql: load_sql.into(),
            big_columns,
            bindings: Vec::new(),
        }
    }

    /// Register a binding to receive this table's changes.
    pub fn add_binding(&mut self, binding: Binding<R>) {
        self.bindings.push(binding);
    }

    /// Dispatch one event to the appropriate hook (spec.md §4.3/§4.4:
    /// "strictly serially" — the caller, the listener's single receive
    /// loop, guarantees that).
    pub async fn dispatch(&self, event: TableEvent) -> Result<()> {
        match event {
            TableEvent::Init => self.init().await,
            TableEvent::Create(new) => self.create(new).await,
            TableEvent::Update(old, new) => self.update(old, new).await,
            TableEvent::Delete(old) => self.delete(old).await,
            TableEvent::ConnLoss => self.conn_loss().await,
        }
    }

    /// Full reload: query `loadSql`, clear every binding, save every
    /// returned row to every binding. Logs query and total duration
    /// (spec.md §4.3 "Reload latency logging").
    pub async fn init(&self) -> Result<()> {
        let total_start = Instant::now();
        let query_start = Instant::now();
        let rows = self
            .row_source
            .query(&self.load_sql)
            .await
            .map_err(|source| ReloadError::Query {
                table: self.name.clone(),
                query_ms: query_start.elapsed().as_millis(),
                source: Box::new(source),
            })?;
        let query_ms = query_start.elapsed().as_millis();

        for binding in &self.bindings {
            binding.clear();
        }
        for row in rows {
            match decode::<R>(&self.name, row) {
                Ok(decoded) => {
                    for binding in &self.bindings {
                        binding.save(&decoded);
                    }
                }
                Err(err) => error!(table = %self.name, error = %err, "dropping row during reload"),
            }
        }

        info!(
            table = %self.name,
            query_ms,
            total_ms = total_start.elapsed().as_millis(),
            "reloaded table"
        );
        Ok(())
    }

    /// A new row arrived. Decode it, optionally fill deferred `bigColumns`
    /// fields with a secondary query, then save to every binding. A
    /// deserialize failure is logged and the single event dropped (spec.md
    /// §7); it does not propagate.
    pub async fn create(&self, new: Map<String, Value>) -> Result<()> {
        let new = self.fill_big_columns(new).await?;
        let row = match decode::<R>(&self.name, new) {
            Ok(row) => row,
            Err(err) => {
                error!(table = %self.name, error = %err, "dropping create event");
                return Ok(());
            }
        };
        for binding in &self.bindings {
            binding.save(&row);
        }
        Ok(())
    }

    /// An existing row changed: `remove(old)` then `save(new)` against
    /// every binding (spec.md §4.3/§5 — two single-row critical sections
    /// per binding unless the binding itself batches them).
    pub async fn update(&self, old: Map<String, Value>, new: Map<String, Value>) -> Result<()> {
        let old_row = self.decode_or_drop("update (old)", old);
        let new_row = self.decode_or_drop("update (new)", new);

        if let Some(old_row) = &old_row {
            for binding in &self.bindings {
                binding.remove(old_row);
            }
        }
        if let Some(new_row) = &new_row {
            for binding in &self.bindings {
                binding.save(new_row);
            }
        }
        Ok(())
    }

    /// A row was deleted: `remove(old)` against every binding.
    pub async fn delete(&self, old: Map<String, Value>) -> Result<()> {
        if let Some(row) = self.decode_or_drop("delete", old) {
            for binding in &self.bindings {
                binding.remove(&row);
            }
        }
        Ok(())
    }

    /// The driver reported a connection-loss sentinel: reload and log the
    /// outcome (spec.md §4.3 `connLoss`).
    pub async fn conn_loss(&self) -> Result<()> {
        match self.init().await {
            Ok(()) => {
                info!(table = %self.name, "recovered from connection loss");
                Ok(())
            }
            Err(err) => {
                error!(table = %self.name, error = %err, "reload after connection loss failed");
                Err(err)
            }
        }
    }

    fn decode_or_drop(&self, event: &'static str, json: Map<String, Value>) -> Option<R> {
        match decode::<R>(&self.name, json) {
            Ok(row) => Some(row),
            Err(err) => {
                error!(table = %self.name, %event, error = %err, "dropping event");
                None
            }
        }
    }

    async fn fill_big_columns(&self, mut new: Map<String, Value>) -> Result<Map<String, Value>> {
        let Some(big_columns) = &self.big_columns else {
            return Ok(new);
        };
        let sql = (big_columns.query)(&new);
        let mut rows = self.row_source.query(&sql).await.map_err(|source| ReloadError::BigColumns {
            table: self.name.clone(),
            source: Box::new(source),
        })?;
        if let Some(extra) = rows.pop() {
            new.extend(extra);
        }
        Ok(new)
    }
}
